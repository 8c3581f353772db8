use phf::{Map, phf_map};

pub const BUILTIN_DESCRIPTOR_COLUMNS: [&str; 3] = ["hydropathy", "volume", "charge"];

// Kyte & Doolittle (1982) hydropathy, Zamyatnin (1972) residue volume, charge at pH 7.
pub(crate) static BUILTIN_DESCRIPTORS: Map<u8, [f64; 3]> = phf_map! {
    b'A' => [1.8, 88.6, 0.0],
    b'C' => [2.5, 108.5, 0.0],
    b'D' => [-3.5, 111.1, -1.0],
    b'E' => [-3.5, 138.4, -1.0],
    b'F' => [2.8, 189.9, 0.0],
    b'G' => [-0.4, 60.1, 0.0],
    b'H' => [-3.2, 153.2, 0.0],
    b'I' => [4.5, 166.7, 0.0],
    b'K' => [-3.9, 168.6, 1.0],
    b'L' => [3.8, 166.7, 0.0],
    b'M' => [1.9, 162.9, 0.0],
    b'N' => [-3.5, 114.1, 0.0],
    b'P' => [-1.6, 112.7, 0.0],
    b'Q' => [-3.5, 143.8, 0.0],
    b'R' => [-4.5, 173.4, 1.0],
    b'S' => [-0.8, 89.0, 0.0],
    b'T' => [-0.7, 116.1, 0.0],
    b'V' => [4.2, 140.0, 0.0],
    b'W' => [-0.9, 227.8, 0.0],
    b'Y' => [-1.3, 193.6, 0.0],
};

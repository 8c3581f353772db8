use crate::cli::EncodeArgs;
use crate::error::{CliError, Result};
use crate::utils::{io, parser};
use directevo::core::encoding::SequenceEncoder;
use tracing::info;

pub fn run(args: EncodeArgs) -> Result<()> {
    let alphabet =
        parser::parse_alphabet(&args.alphabet).map_err(|e| CliError::Argument(e.to_string()))?;
    let encoding =
        parser::parse_encoding(&args.encoding).map_err(|e| CliError::Argument(e.to_string()))?;
    let scheme = io::load_scheme(&encoding)?;

    let sequences = io::read_sequences(&args.input)?;
    let length = sequences[0].len();
    let encoder = SequenceEncoder::new(alphabet, scheme, length)?;
    info!(
        "Encoding {} sequence(s) with the {} scheme ({} features each)",
        sequences.len(),
        encoder.scheme().name(),
        encoder.dimension()
    );

    io::write_features(&args.output, &encoder, &sequences)?;
    println!(
        "Encoded {} sequence(s) into {} feature(s) each: {}",
        sequences.len(),
        encoder.dimension(),
        args.output.display()
    );
    Ok(())
}

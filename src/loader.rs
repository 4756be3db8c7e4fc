//! Hex memory images: `"51 05 00"` puts 0x51 at address 0, 0x05 at 1 and so on.

use crate::error::LoadError;
use crate::memory::parse::{Location, ParseError, ParseErrorKind};
use crate::processor::Processor;

/// Writes the whitespace separated hex tokens of `image` to consecutive
/// addresses starting at 0. Returns the number of cells written.
///
/// # Errors
///
/// Stops at the first token that is not a hex number, or whose value or
/// address is rejected by [`Processor::write_memory`]. Cells written before
/// the failing token keep their new values.
pub fn load_image(processor: &mut Processor, image: &str) -> Result<usize, LoadError> {
    let mut written = 0;

    for (address, token) in image.split_whitespace().enumerate() {
        let value = i64::from_str_radix(token, 16).map_err(|_| {
            ParseError::new(
                ParseErrorKind::InvalidNumber { radix: 16 },
                Some(format!("`{}` is not a hex number", token).into()),
                Location::Token(address),
            )
        })?;

        processor.write_memory(address, value)?;
        log::trace!("loaded 0x{:02x} at {}", value, address);
        written += 1;
    }

    log::info!("loaded {} cells", written);

    Ok(written)
}

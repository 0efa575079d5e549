use alloc::format;
use core::error;
use core::fmt::{Display, Formatter, Result};

#[derive(Debug)]
pub enum Error {
    Cast(bytemuck::PodCastError),
    FieldOverflow { field: &'static str, value: u64 },
    NameTooLong { field: &'static str, len: usize, max: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result {
        use Error::*;

        let msg = match self {
            Cast(err) => format!("Cast: {:?}", err),
            FieldOverflow { field, value } => {
                format!("Value {} does not fit in the {} field", value, field)
            }
            NameTooLong { field, len, max } => {
                format!("{} is {} bytes long, at most {} fit", field, len, max)
            }
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {}

impl From<bytemuck::PodCastError> for Error {
    fn from(err: bytemuck::PodCastError) -> Error {
        Error::Cast(err)
    }
}

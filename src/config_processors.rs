use justconfig::error::ConfigError;
use justconfig::item::{MapAction, StringItem};

/// Strips one pair of surrounding double quotes from configuration values,
/// so `path = "datasets/purchases.csv"` and `path = datasets/purchases.csv` read the same.
pub trait Unquote
where
    Self: Sized,
{
    fn unquote(self) -> Result<StringItem, ConfigError>;
}

impl Unquote for Result<StringItem, ConfigError> {
    fn unquote(self) -> Result<StringItem, ConfigError> {
        self?.map(|raw| {
            match raw
                .trim()
                .strip_prefix('"')
                .and_then(|value| value.strip_suffix('"'))
            {
                Some(unquoted) => MapAction::Replace(vec![unquoted.to_owned()]),
                None => MapAction::Keep,
            }
        })
    }
}

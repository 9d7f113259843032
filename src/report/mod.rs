pub mod json;
pub mod table;

use serde::Serialize;

use crate::error::Result;

/// Prints `value` as JSON, or the table produced by `table` otherwise.
pub fn print<T, F>(value: &T, as_json: bool, table: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    if as_json {
        println!("{}", json::render(value)?);
    } else {
        print!("{}", table(value));
    }
    Ok(())
}

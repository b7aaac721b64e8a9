pub mod csv;

pub use self::csv::{result_csv_path, write_result_csv};

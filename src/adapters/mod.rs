// Adapters layer: concrete implementations of the domain ports (event stream, calibration table, reporters).

pub mod csv_store;
pub mod line_reader;
pub mod memory_store;
pub mod reporters;

pub use csv_store::CsvCalibrationStore;
pub use line_reader::{BoxedLineReader, LineSampleReader};
pub use memory_store::MemoryCalibrationStore;
pub use reporters::{ConsoleReporter, CsvReporter, JsonLinesReporter};

pub mod decoder;
pub mod parser;
pub mod reasons;
pub mod scan;

pub use decoder::{decode_camera, decode_group_folder, decode_timestamp};
pub use parser::{parse_archive, parse_archive_with_report, ParseReport, SkipReason, SkippedClip};
pub use reasons::{classify, Classification};
pub use scan::scan_directory;

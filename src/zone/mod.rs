pub mod errors;
pub mod opaque;
pub mod parser;
pub mod record;
#[allow(clippy::module_inception)]
pub mod zone;

pub use errors::{Result, ZoneError};
pub use parser::ZoneParser;
pub use record::ZoneRecord;
pub use zone::{Zone, ZoneStats};

use crate::error::CheckError;
use std::path::Path;
use tracing::{info, warn};

/// Zone constants
pub mod constants {
    /// TTL used when neither the record, `$TTL`, nor an earlier record
    /// gives one (1 hour)
    pub const DEFAULT_TTL: u32 = 3600;

    /// Maximum zone file size (10MB)
    pub const MAX_ZONE_FILE_SIZE: usize = 10 * 1024 * 1024;

    /// Maximum nesting of `$INCLUDE`
    pub const MAX_INCLUDE_DEPTH: usize = 16;
}

/// Loads the zone `origin` from `path` without relativising names.
///
/// A file that cannot be opened or read becomes [`CheckError::NoZoneFile`];
/// malformed content stays a zone error. Both are fatal for a run.
pub fn load_zone(origin: &str, path: &Path) -> std::result::Result<Zone, CheckError> {
    let zone = ZoneParser::new(origin)
        .parse_file(path)
        .map_err(|e| match e {
            ZoneError::IoError(reason) => CheckError::NoZoneFile {
                path: path.display().to_string(),
                reason,
            },
            other => CheckError::Zone(other),
        })?;

    let stats = zone.stats();
    info!(
        "Loaded zone {} from {}: {} record sets, {} records",
        zone.origin,
        path.display(),
        zone.len(),
        stats.total_records
    );
    if stats.skipped_records > 0 {
        warn!(
            "{} records of unsupported types in {} were not compared",
            stats.skipped_records,
            path.display()
        );
    }
    Ok(zone)
}

//! # Sample log telecommands

use structopt::StructOpt;

/// A query or export request on the sample log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, StructOpt)]
pub enum SamplesCmd {
    /// Retrieve every logged sample
    #[structopt(name = "all")]
    GetAll,

    /// Retrieve collection statistics
    #[structopt(name = "stats")]
    GetStatistics,

    /// Export the samples as a GeoJSON feature collection
    #[structopt(name = "geojson")]
    ExportGeojson,

    /// Export the samples as CSV
    #[structopt(name = "csv")]
    ExportCsv,
}

impl SamplesCmd {
    pub(crate) fn from_str(s: &str) -> Option<Self> {
        match s {
            "get_all" => Some(SamplesCmd::GetAll),
            "get_statistics" => Some(SamplesCmd::GetStatistics),
            "export_geojson" => Some(SamplesCmd::ExportGeojson),
            "export_csv" => Some(SamplesCmd::ExportCsv),
            _ => None,
        }
    }

    /// The command string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplesCmd::GetAll => "get_all",
            SamplesCmd::GetStatistics => "get_statistics",
            SamplesCmd::ExportGeojson => "export_geojson",
            SamplesCmd::ExportCsv => "export_csv",
        }
    }
}

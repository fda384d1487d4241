//! Staff location CLI subcommands.

use clap::Subcommand;

/// Staff check-in commands.
#[derive(Subcommand, Debug, Clone)]
pub enum StaffCommand {
    /// Record where a staff member is now.
    Checkin {
        /// Staff name
        name: String,
        /// Latitude in degrees
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        /// Longitude in degrees
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// List the latest location of every staff member.
    List,
}

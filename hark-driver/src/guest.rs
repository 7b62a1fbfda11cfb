//! Per-guest settings drivers need.

use hark_store::Guest;

/// Every guest hark can create machines for.
pub fn guests() -> &'static [Guest] {
    &Guest::ALL
}

/// The VirtualBox `--ostype` for a guest.
pub fn virtualbox_os_type(guest: Guest) -> &'static str {
    match guest {
        Guest::Debian8 => "Debian_64",
    }
}

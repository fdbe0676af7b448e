//! Network interface planning.
//!
//! The planner is a pure function from the logical network manifest and
//! the host's NIC inventory to concrete static and DHCP interface
//! configurations. Side effects (writing interface files, bouncing
//! devices) belong to platform-specific writers outside this crate.

pub mod addr;
pub mod creator;
pub mod interfaces;
pub mod routes;
pub mod settings;

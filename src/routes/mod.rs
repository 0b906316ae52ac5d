pub mod pages;
pub mod registry;
pub mod rsvp;

//! Test doubles and fixture data

mod fixtures;
mod transport;

pub use fixtures::{TestDataFactory, TestScenario, CAVE, SECTION};
pub use transport::SharedTransport;

//! Outgoing HTTP for asset downloads.
//!
//! Backend API calls go through `ai::client`; this module only fetches the
//! bytes behind URLs the backends hand back.

mod client;

pub use client::{HttpClient, MockClient, MockResponse, ReqwestClient};

pub mod client;
pub mod normalize;

pub use client::{GitHubClient, RepoSearchUpstream, UpstreamPage, UpstreamRequest};
pub use normalize::normalize;

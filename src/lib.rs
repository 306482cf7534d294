//! snykctl - command-line client for the Snyk v1 REST API.
//!
//! This library holds the domain core: organization, project and member
//! registries, issue queries, the attribute/tag filter grammar and the
//! cross-project report, all written against the [`Transport`] trait so
//! they run the same over HTTP or against an in-memory mock.

pub mod config;
pub mod error;
pub mod filter;
pub mod ignores;
pub mod issues;
pub mod logging;
pub mod orgs;
pub mod output;
pub mod projects;
pub mod report;
pub mod transport;
pub mod types;
pub mod users;

pub use config::{Config, ConfigError, default_config_path};
pub use error::ApiError;
pub use filter::{AttributeSelection, build_attributes_body, build_filter_body, parse_tag, parse_tags};
pub use issues::{IssueCountTotals, IssueQuery, check_issue_type, build_issue_type_filter};
pub use orgs::OrgRegistry;
pub use output::{ListMode, OutputFormat};
pub use projects::ProjectRegistry;
pub use report::{ReportAggregator, ReportStage};
pub use transport::{ApiResponse, HttpTransport, Method, MockTransport, Transport, TransportError};
pub use types::{Issue, IssuePathsResult, Org, Project, Tag, User};
pub use users::UserRegistry;

/*!
 * # Polyroute - provider-failover translation routing
 *
 * A Rust library that routes translation requests across interchangeable
 * AI providers under budget, compliance and glossary constraints, and
 * replays offline drafts in the background.
 *
 * ## Features
 *
 * - Provider failover chain with per-provider retry and latency budgets
 * - Daily spend ceiling enforced atomically across concurrent requests
 * - Compliance gating: PII detection, banned phrases, data residency
 *   regions and certification requirements
 * - Three-tier glossary (user > channel > tenant) with conflict
 *   detection and caller-driven resolution
 * - Source language detection with provider-backed and heuristic paths
 * - Offline draft queue with scheduled replay and error-classified
 *   backoff
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `request`: Request and result types shared across the pipeline
 * - `budget`: Daily spend ceiling
 * - `compliance`: Admission policy evaluation
 * - `glossary`: Tiered terminology substitution
 * - `detection`: Source language detection
 * - `providers`: Translation backends:
 *   - `providers::openai_compat`: OpenAI-compatible HTTP client
 *   - `providers::mock`: Scriptable in-process provider for tests
 * - `router`: Admission-checked failover routing
 * - `pipeline`: Validation and caller-facing framing above the router
 * - `drafts`: Offline draft persistence and replay
 * - `audit`: Translation audit trail
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the library
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod audit;
pub mod budget;
pub mod compliance;
pub mod detection;
pub mod drafts;
pub mod errors;
pub mod glossary;
pub mod language_utils;
pub mod pipeline;
pub mod providers;
pub mod request;
pub mod router;

// Re-export main types for easier usage
pub use app_config::Config;
pub use budget::BudgetGuard;
pub use compliance::{ComplianceEvaluation, ComplianceGateway, CompliancePolicy};
pub use drafts::{DraftReplayEngine, DraftStatus, DraftStore, OfflineDraft};
pub use errors::{ProviderError, RouteError};
pub use glossary::{GlossaryEntry, GlossaryResolver, GlossaryScope, TermResolution};
pub use pipeline::{TranslateOutcome, TranslationPipeline};
pub use providers::{Provider, ProviderSpec};
pub use request::{RoutedTranslation, TranslationRequest};
pub use router::TranslationRouter;

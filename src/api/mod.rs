/*
 * Responsibility
 * - gateway の URL 構造 (routes()) の公開
 * - handler / extractor の置き場
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;

/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth (route 解決 + bearer 検証), cors, http (request-id / trace / limit / timeout)
 */
pub mod auth;
pub mod cors;
pub mod http;

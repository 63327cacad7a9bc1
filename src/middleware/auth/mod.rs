/*
 * Responsibility
 * - Bearer トークンの抽出 (bearer) と検証 gate (gate)
 * - gate は CredentialVerifier だけを知っていて、トークン方式は起動時に決まる
 */
pub mod bearer;
pub mod gate;

pub use bearer::extract_bearer;

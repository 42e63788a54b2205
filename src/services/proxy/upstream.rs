/*
 * Responsibility
 * - 転送先 backend service の列挙 (auth / reservas / incidencias / attendance)
 * - 各 service の設定キー・デフォルト URL・表示名
 */
use std::fmt;

/// A backend service the gateway forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    Auth,
    Reservas,
    Incidencias,
    Attendance,
}

impl Upstream {
    pub const ALL: [Upstream; 4] = [
        Upstream::Auth,
        Upstream::Reservas,
        Upstream::Incidencias,
        Upstream::Attendance,
    ];

    /// Short name used in paths (`/health/{name}`) and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Reservas => "reservas",
            Self::Incidencias => "incidencias",
            Self::Attendance => "attendance",
        }
    }

    /// Human readable name used in client-facing error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Auth => "Auth",
            Self::Reservas => "Reservas",
            Self::Incidencias => "Incidencias",
            Self::Attendance => "Attendance",
        }
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH_SERVICE_URL",
            Self::Reservas => "RESERVAS_SERVICE_URL",
            Self::Incidencias => "INCIDENCIAS_SERVICE_URL",
            Self::Attendance => "ATTENDANCE_SERVICE_URL",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            Self::Auth => "http://localhost:8003",
            Self::Reservas => "http://localhost:8001",
            Self::Incidencias => "http://localhost:8002",
            Self::Attendance => "http://localhost:8004",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.name() == name)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Modelos de principals
//!
//! Este módulo contiene las tres clases de cuentas del sistema (operadores,
//! propietarios y técnicos) y la unión etiquetada `Principal`. Cada variante
//! vive en su propia tabla; no existe una tabla de identidad compartida.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Discriminante de variante - identifica el namespace de un principal
/// y por lo tanto la tabla de tokens contra la que se valida su clave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Operator,
    Owner,
    Technician,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Operator => "operator",
            PrincipalKind::Owner => "owner",
            PrincipalKind::Technician => "technician",
        }
    }
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operador de vehículos - mapea a la tabla operators
#[derive(Debug, Clone, FromRow)]
pub struct Operator {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub licence_number: String,
    /// Vehículo asignado (back-reference débil, NULL si no tiene)
    pub vehicle_id: Option<Uuid>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Propietario de vehículos - mapea a la tabla owners
#[derive(Debug, Clone, FromRow)]
pub struct Owner {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Técnico de servicio - mapea a la tabla technicians
#[derive(Debug, Clone, FromRow)]
pub struct Technician {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub speciality: String,
    pub location: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unión etiquetada sobre las tres variantes de cuenta.
///
/// La autorización se decide con pattern matching sobre la variante,
/// nunca comprobando la presencia de atributos.
#[derive(Debug, Clone)]
pub enum Principal {
    Operator(Operator),
    Owner(Owner),
    Technician(Technician),
}

impl Principal {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::Operator(_) => PrincipalKind::Operator,
            Principal::Owner(_) => PrincipalKind::Owner,
            Principal::Technician(_) => PrincipalKind::Technician,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Principal::Operator(o) => o.id,
            Principal::Owner(o) => o.id,
            Principal::Technician(t) => t.id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Principal::Operator(o) => &o.username,
            Principal::Owner(o) => &o.username,
            Principal::Technician(t) => &t.username,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::Operator(o) => &o.email,
            Principal::Owner(o) => &o.email,
            Principal::Technician(t) => &t.email,
        }
    }

    pub fn phone_number(&self) -> &str {
        match self {
            Principal::Operator(o) => &o.phone_number,
            Principal::Owner(o) => &o.phone_number,
            Principal::Technician(t) => &t.phone_number,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            Principal::Operator(o) => &o.password_hash,
            Principal::Owner(o) => &o.password_hash,
            Principal::Technician(t) => &t.password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_as_str() {
        assert_eq!(PrincipalKind::Operator.as_str(), "operator");
        assert_eq!(PrincipalKind::Owner.as_str(), "owner");
        assert_eq!(PrincipalKind::Technician.as_str(), "technician");
    }
}

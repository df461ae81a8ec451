//! Token de acceso opaco
//!
//! Cada token pertenece a exactamente un principal de una variante conocida.
//! La clave es una cadena opaca de 40 caracteres alfanuméricos generada con
//! un RNG impredecible; la expiración por defecto es creación + 30 días.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::FromRow;
use uuid::Uuid;

/// Longitud fija de la clave opaca
pub const TOKEN_KEY_LEN: usize = 40;

/// Vida útil por defecto de un token, en días
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;

/// Token de acceso - una fila en la tabla de tokens de su variante.
/// La clave solo tiene significado dentro de la tabla de su propia variante.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub key: String,
    pub principal_id: Uuid,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl AccessToken {
    /// Crear un token nuevo para un principal con el TTL indicado
    pub fn issue_for(principal_id: Uuid, ttl_days: i64) -> Self {
        let now = Utc::now();
        Self {
            key: generate_key(),
            principal_id,
            created: now,
            expires: now + Duration::days(ttl_days),
        }
    }

    /// La expiración se comprueba de forma lazy en el momento de validar;
    /// no hay barrido de fondo que elimine filas expiradas.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires
    }
}

/// Generar una clave opaca de 40 caracteres alfanuméricos.
/// `thread_rng` es un CSPRNG sembrado por el sistema operativo.
pub fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_KEY_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_shape() {
        let key = generate_key();
        assert_eq!(key.len(), TOKEN_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_key_unique() {
        // No es una prueba de criptografía, solo de que no devolvemos
        // la misma clave dos veces seguidas.
        assert_ne!(generate_key(), generate_key());
    }

    #[test]
    fn test_token_expiry() {
        let token = AccessToken::issue_for(Uuid::new_v4(), DEFAULT_TOKEN_TTL_DAYS);
        assert!(!token.is_expired());
        assert_eq!(token.expires, token.created + Duration::days(30));

        let expired = AccessToken {
            expires: Utc::now() - Duration::seconds(1),
            ..token
        };
        assert!(expired.is_expired());
    }
}

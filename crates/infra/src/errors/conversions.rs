//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tempora_domain::TemporaError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TemporaError);

impl From<InfraError> for TemporaError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TemporaError> for InfraError {
    fn from(value: TemporaError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTemporaError {
    fn into_tempora(self) -> TemporaError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TemporaError */
/* -------------------------------------------------------------------------- */

impl IntoTemporaError for SqlError {
    fn into_tempora(self) -> TemporaError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        TemporaError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        TemporaError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        TemporaError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        TemporaError::Database("foreign key constraint violation".into())
                    }
                    _ => TemporaError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => TemporaError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                TemporaError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                TemporaError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => TemporaError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidParameterName(parameter_name) => {
                TemporaError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => {
                TemporaError::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => TemporaError::Database("invalid SQL query".into()),
            other => TemporaError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_tempora())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → TemporaError */
/* -------------------------------------------------------------------------- */

impl IntoTemporaError for r2d2::Error {
    fn into_tempora(self) -> TemporaError {
        TemporaError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_tempora())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TemporaError */
/* -------------------------------------------------------------------------- */

impl IntoTemporaError for HttpError {
    fn into_tempora(self) -> TemporaError {
        if self.is_timeout() {
            return TemporaError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return TemporaError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            // The tracker token is static operator configuration, so a
            // rejected credential is a config problem rather than a
            // transient one.
            return match code {
                401 | 403 => TemporaError::Config(message),
                404 => TemporaError::NotFound(message),
                429 => TemporaError::Network(message),
                400..=499 => TemporaError::InvalidInput(message),
                500..=599 => TemporaError::Network(message),
                _ => TemporaError::Network(message),
            };
        }

        TemporaError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_tempora())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

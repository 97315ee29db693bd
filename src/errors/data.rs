use thiserror::Error;

/// Failures reported by the data-access layer
///
/// Stores translate their driver errors into these variants so the error
/// normalizer can classify them without inspecting driver text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// A write collided with an existing unique value
    #[error("unique constraint failed on fields: {}", fields.join(", "))]
    UniqueConstraint { fields: Vec<String> },

    /// The addressed record does not exist
    #[error("record not found")]
    RecordNotFound,

    /// Any other well-formed rejection from the data layer
    #[error("data request failed ({code}): {message}")]
    Request { code: String, message: String },

    /// Values did not match the shape the data layer expects
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl DataError {
    pub fn unique(field: impl Into<String>) -> Self {
        Self::UniqueConstraint {
            fields: vec![field.into()],
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::UniqueConstraint {
                    fields: db
                        .constraint()
                        .map(|name| vec![name.to_string()])
                        .unwrap_or_default(),
                };
            }
            return Self::Request {
                code: db
                    .code()
                    .map(|code| code.into_owned())
                    .unwrap_or_else(|| "unknown".to_string()),
                message: db.message().to_string(),
            };
        }

        match &err {
            sqlx::Error::RowNotFound => Self::RecordNotFound,
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_) => Self::InvalidData(err.to_string()),
            _ => Self::Request {
                code: "unknown".to_string(),
                message: err.to_string(),
            },
        }
    }
}

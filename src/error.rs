//! Crate-level error types.
//!
//! Every fallible operation in the crate returns [`Result`]. Server-side
//! failures keep the backend's `message` verbatim so the front end can show
//! it as-is; everything else falls back to [`GENERIC_ERROR_MESSAGE`].

use thiserror::Error;

/// Shown when a failure carries no server message (network down, bad JSON).
pub const GENERIC_ERROR_MESSAGE: &str = "Une erreur est survenue. Veuillez réessayer.";

pub type Result<T> = std::result::Result<T, AnosunuError>;

/// Client-side input checks. Raised before any network call is made.
///
/// Messages are shown to the user as-is, in French like the rest of the UI.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("l'indicatif doit comporter 2 ou 3 chiffres (reçu {0:?})")]
    PhonePrefix(String),

    #[error("indiquez exactement 2 chiffres du numéro (reçu {0:?})")]
    PhoneSuffix(String),

    #[error("indiquez exactement 4 lettres ou chiffres de la transaction (reçu {0:?})")]
    TransactionSuffix(String),

    #[error("le montant payé doit être un nombre positif (reçu {0:?})")]
    Amount(String),

    #[error("le code d'accès comporte 6 lettres ou chiffres (reçu {0:?})")]
    AccessCode(String),

    #[error("le nom de la salle est obligatoire")]
    RoomNameEmpty,

    #[error("le nom de la salle ne peut pas dépasser {max} caractères (reçu {actual})")]
    RoomNameTooLong { max: usize, actual: usize },

    #[error("participants : il faut {min_allowed} <= min <= max <= {max_allowed} (reçu min {min}, max {max})")]
    Participants {
        min: u32,
        max: u32,
        min_allowed: u32,
        max_allowed: u32,
    },

    #[error("la durée doit être comprise entre 1 et {max} minutes (reçu {actual})")]
    Duration { max: u32, actual: u32 },

    #[error("le contenu est vide")]
    ContentEmpty,

    #[error("le contenu ne peut pas dépasser {max} caractères (reçu {actual})")]
    ContentTooLong { max: usize, actual: usize },

    #[error("choisissez au moins un sujet")]
    NoTopics,
}

/// Errors returned by the Anosunu client.
#[derive(Debug, Error)]
pub enum AnosunuError {
    /// The request never reached the server.
    #[error("connection to {url} failed: {detail}")]
    Connect { url: String, detail: String },

    /// The server replied with a non-2xx status.
    #[error("HTTP {status} from {url}{}", suffix(.message))]
    Http {
        status: u16,
        url: String,
        /// `message` from the response body, when the server sent one.
        message: Option<String>,
        /// Machine-readable `error_code`, when the server sent one.
        code: Option<String>,
    },

    /// The response body did not match the expected shape.
    #[error("unexpected response on field '{field}': {detail}")]
    Decode { field: String, detail: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),

    /// A bounded poll ran out of attempts without a terminal status.
    #[error("no final answer after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The payment provider reported a terminal non-success status.
    #[error("payment ended with status '{status}'")]
    PaymentNotCompleted { status: String },

    /// The flow was used out of order (e.g. confirming before "already paid").
    #[error("invalid step: {0}")]
    InvalidState(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl AnosunuError {
    /// Text suitable for a dismissible error dialog.
    pub fn user_message(&self) -> String {
        match self {
            AnosunuError::Http {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            AnosunuError::Validation(v) => v.to_string(),
            AnosunuError::PaymentNotCompleted { .. } => {
                "Le paiement n'a pas été validé. Vérifiez votre reçu et réessayez.".to_string()
            }
            AnosunuError::Timeout { .. } => {
                "La demande n'a pas encore été traitée. Réessayez plus tard.".to_string()
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AnosunuError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-supplied message, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AnosunuError::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Server-supplied `error_code`, if any.
    pub fn server_code(&self) -> Option<&str> {
        match self {
            AnosunuError::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

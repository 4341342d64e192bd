use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Verdict {
    pub is_danger: bool,
    pub reason_english: String,
    pub reason_local: String,
    /// False when the classifier could not be reached and this is the
    /// fallback answer.
    pub analyzed: bool,
}

impl Verdict {
    pub fn unanalyzed() -> Self {
        Self {
            is_danger: false,
            reason_english: "Could not analyze this message. Please be cautious and check with someone you trust.".to_string(),
            reason_local: "பகுப்பாய்வு செய்ய முடியவில்லை. கவனமாக இருங்கள், நம்பகமான நபரிடம் சரிபார்க்கவும்.".to_string(),
            analyzed: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier not configured")]
    NotConfigured,
    #[error("classifier unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("classifier returned malformed output: {reason}")]
    Malformed { reason: String },
}

#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

pub trait Classifier: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Verdict, ClassifierError>;
}

/// Runs the classifier without ever failing the caller's flow: any
/// classifier failure becomes [`Verdict::unanalyzed`]. Only empty input is
/// rejected.
pub fn analyze_or_fallback(classifier: &dyn Classifier, text: &str) -> Result<Verdict, SafetyError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SafetyError::InvalidInput {
            message: "text is required".to_string(),
        });
    }
    match classifier.analyze(text) {
        Ok(verdict) => Ok(verdict),
        Err(err) => {
            warn!(error = %err, "safety classifier failed, returning fallback verdict");
            Ok(Verdict::unanalyzed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<bool, ()>);

    impl Classifier for Fixed {
        fn analyze(&self, _text: &str) -> Result<Verdict, ClassifierError> {
            match self.0 {
                Ok(is_danger) => Ok(Verdict {
                    is_danger,
                    reason_english: "Asks for an OTP.".to_string(),
                    reason_local: "OTP கேட்கிறது.".to_string(),
                    analyzed: true,
                }),
                Err(()) => Err(ClassifierError::Unavailable {
                    reason: "quota exceeded".to_string(),
                }),
            }
        }
    }

    #[test]
    fn passes_through_classifier_verdict() {
        let verdict = analyze_or_fallback(&Fixed(Ok(true)), "Share your OTP now").unwrap();
        assert!(verdict.is_danger);
        assert!(verdict.analyzed);
    }

    #[test]
    fn failure_degrades_to_flagged_safe_verdict() {
        let verdict = analyze_or_fallback(&Fixed(Err(())), "hello").unwrap();
        assert!(!verdict.is_danger);
        assert!(!verdict.analyzed);
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(
            analyze_or_fallback(&Fixed(Ok(false)), "   "),
            Err(SafetyError::InvalidInput { .. })
        ));
    }
}

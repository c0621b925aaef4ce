//! Classification of generation failures into user-facing, localized messages.
//!
//! The backend's error vocabulary isn't contractual, so detection is keyword
//! matching over the raw message. Rules are checked in order; the first hit wins.

use serde::Serialize;

use crate::domain::Language;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
  CredentialMissing,
  CredentialInvalid,
  PermissionDenied,
  QuotaExceeded,
  NetworkFailure,
  Timeout,
  ContentFiltered,
  RateLimited,
  ModelUnavailable,
  InternalBackendError,
  Unknown,
  /// Rejected before any backend call (blank topic, nothing to extend, ...).
  InvalidRequest,
  /// Local persistence failed; never derived from backend text.
  StorageFailure,
}

/// What the user sees when something goes wrong.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifiedError {
  pub category: ErrorCategory,
  pub message: String,
  pub suggestions: Vec<String>,
  pub original: String,
}

impl ClassifiedError {
  pub fn new(category: ErrorCategory, language: Language, original: impl Into<String>) -> Self {
    let (message, suggestions) = localized(category, language);
    Self {
      category,
      message: message.to_string(),
      suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
      original: original.into(),
    }
  }

  pub fn credential_missing(language: Language) -> Self {
    Self::new(ErrorCategory::CredentialMissing, language, "no API key configured")
  }

  /// Local store write failures. Not keyword-classified: their text is ours, not the backend's.
  pub fn storage_failure(language: Language, original: impl Into<String>) -> Self {
    Self::new(ErrorCategory::StorageFailure, language, original)
  }

  /// Validation failures carry their reason as the message.
  pub fn invalid_request(reason: impl Into<String>) -> Self {
    let reason = reason.into();
    Self {
      category: ErrorCategory::InvalidRequest,
      message: reason.clone(),
      suggestions: Vec::new(),
      original: reason,
    }
  }
}

const RULES: &[(ErrorCategory, &[&str])] = &[
  (ErrorCategory::CredentialInvalid, &[
    "api key", "api_key", "apikey", "unauthorized", "unauthenticated", "invalid authentication", "http 401",
  ]),
  (ErrorCategory::PermissionDenied, &["permission", "forbidden", "denied", "http 403"]),
  (ErrorCategory::QuotaExceeded, &["quota", "billing", "insufficient"]),
  (ErrorCategory::RateLimited, &["rate limit", "rate_limit", "ratelimit", "too many", "http 429"]),
  (ErrorCategory::Timeout, &["timeout", "timed out", "deadline", "http 504"]),
  (ErrorCategory::NetworkFailure, &[
    "network", "connection", "connect", "fetch", "dns", "error sending request", "unreachable",
  ]),
  (ErrorCategory::ContentFiltered, &[
    "safety", "content filter", "content_filter", "content_policy", "moderation", "blocked", "filtered",
  ]),
  (ErrorCategory::ModelUnavailable, &["model", "overload", "unavailable", "http 503"]),
  (ErrorCategory::InternalBackendError, &["internal", "server error", "http 500", "http 502", "bad gateway"]),
  (ErrorCategory::QuotaExceeded, &["exceeded", "limit"]),
];

/// Pure keyword detection; falls back to `Unknown`.
pub fn detect_category(raw: &str) -> ErrorCategory {
  let lower = raw.to_lowercase();
  RULES
    .iter()
    .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
    .map(|(category, _)| *category)
    .unwrap_or(ErrorCategory::Unknown)
}

/// Classify a raw failure message for a UI in `language`.
pub fn classify(raw: &str, language: Language) -> ClassifiedError {
  ClassifiedError::new(detect_category(raw), language, raw)
}

fn localized(category: ErrorCategory, language: Language) -> (&'static str, &'static [&'static str]) {
  use ErrorCategory::*;
  use Language::*;
  match (category, language) {
    (CredentialMissing, Arabic) => ("لم يتم إدخال مفتاح API", &["افتح الإعدادات وأدخل مفتاح API الخاص بك"]),
    (CredentialMissing, English) => ("No API key has been configured", &["Open the settings and enter your API key"]),
    (CredentialMissing, French) => ("Aucune clé API n'est configurée", &["Ouvrez les paramètres et saisissez votre clé API"]),

    (CredentialInvalid, Arabic) => ("مفتاح API غير صالح أو منتهي الصلاحية", &["تحقق من نسخ المفتاح كاملاً دون مسافات", "أنشئ مفتاحاً جديداً إذا كان القديم قد أُلغي"]),
    (CredentialInvalid, English) => ("The API key is invalid or has expired", &["Check that the whole key was pasted without spaces", "Create a new key if the old one was revoked"]),
    (CredentialInvalid, French) => ("La clé API est invalide ou a expiré", &["Vérifiez que la clé a été collée entièrement, sans espaces", "Créez une nouvelle clé si l'ancienne a été révoquée"]),

    (PermissionDenied, Arabic) => ("تم رفض الوصول إلى الخدمة", &["تأكد من أن المفتاح يملك صلاحية استخدام النموذج"]),
    (PermissionDenied, English) => ("Access to the service was denied", &["Make sure the key is allowed to use the model"]),
    (PermissionDenied, French) => ("L'accès au service a été refusé", &["Vérifiez que la clé est autorisée à utiliser le modèle"]),

    (QuotaExceeded, Arabic) => ("تم تجاوز الحد المسموح من الاستخدام", &["راجع رصيد حسابك أو خطة الاستخدام", "حاول مرة أخرى لاحقاً"]),
    (QuotaExceeded, English) => ("The usage quota has been exceeded", &["Check your account balance or plan", "Try again later"]),
    (QuotaExceeded, French) => ("Le quota d'utilisation est dépassé", &["Vérifiez le solde ou l'offre de votre compte", "Réessayez plus tard"]),

    (NetworkFailure, Arabic) => ("مشكلة في الاتصال بالإنترنت", &["تحقق من اتصالك بالشبكة ثم أعد المحاولة"]),
    (NetworkFailure, English) => ("Could not reach the generation service", &["Check your network connection and try again"]),
    (NetworkFailure, French) => ("Impossible de joindre le service de génération", &["Vérifiez votre connexion réseau puis réessayez"]),

    (Timeout, Arabic) => ("انتهت مهلة الاتصال بالخدمة", &["أعد المحاولة، أو اختر طولاً أقصر للبحث"]),
    (Timeout, English) => ("The service took too long to answer", &["Try again, or choose a shorter length"]),
    (Timeout, French) => ("Le service a mis trop de temps à répondre", &["Réessayez, ou choisissez une longueur plus courte"]),

    (ContentFiltered, Arabic) => ("تم رفض المحتوى بسبب سياسات السلامة", &["أعد صياغة الموضوع بعبارات أخرى"]),
    (ContentFiltered, English) => ("The content was blocked by safety policies", &["Rephrase the topic"]),
    (ContentFiltered, French) => ("Le contenu a été bloqué par les règles de sécurité", &["Reformulez le sujet"]),

    (RateLimited, Arabic) => ("تم تجاوز عدد الطلبات المسموح به", &["انتظر قليلاً قبل إرسال طلب جديد"]),
    (RateLimited, English) => ("Too many requests in a short time", &["Wait a moment before sending another request"]),
    (RateLimited, French) => ("Trop de requêtes en peu de temps", &["Patientez un instant avant une nouvelle requête"]),

    (ModelUnavailable, Arabic) => ("النموذج المطلوب غير متاح حالياً", &["حاول مرة أخرى بعد قليل"]),
    (ModelUnavailable, English) => ("The requested model is currently unavailable", &["Try again in a little while"]),
    (ModelUnavailable, French) => ("Le modèle demandé est indisponible", &["Réessayez dans quelques instants"]),

    (InternalBackendError, Arabic) => ("خطأ داخلي في الخدمة", &["حاول مرة أخرى لاحقاً"]),
    (InternalBackendError, English) => ("The service reported an internal error", &["Try again later"]),
    (InternalBackendError, French) => ("Le service a signalé une erreur interne", &["Réessayez plus tard"]),

    (Unknown, Arabic) => ("حدث خطأ غير متوقع", &[]),
    (Unknown, English) => ("An unexpected error occurred", &[]),
    (Unknown, French) => ("Une erreur inattendue s'est produite", &[]),

    (InvalidRequest, Arabic) => ("الطلب غير صالح", &[]),
    (InvalidRequest, English) => ("The request is not valid", &[]),
    (InvalidRequest, French) => ("La requête n'est pas valide", &[]),

    (StorageFailure, Arabic) => ("تعذر حفظ البيانات محلياً", &["تحقق من صلاحيات مجلد البيانات والمساحة المتاحة"]),
    (StorageFailure, English) => ("Could not save data locally", &["Check the data directory permissions and free space"]),
    (StorageFailure, French) => ("Impossible d'enregistrer les données localement", &["Vérifiez les droits du dossier de données et l'espace libre"]),
  }
}

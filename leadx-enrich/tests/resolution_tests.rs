//! Resolution policy tests with counting stub providers
//!
//! Covers the no-op path, tier ordering, fallback parsing, validation,
//! non-destructive merging, failure degradation and the zip-only resolver.

use async_trait::async_trait;
use leadx_enrich::engine::CallOutcome;
use leadx_enrich::fields::{self, LogicalField};
use leadx_enrich::zip_only::ZipOnlyResolver;
use leadx_enrich::{
    AddressQuery, CompletionProvider, GeocodeProvider, LocationFields, ProviderError, Record,
    ResolutionSource, Resolver,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Stub providers
// ============================================================================

struct StubGeocoder {
    answer: Result<LocationFields, String>,
    calls: AtomicUsize,
    queries: Mutex<Vec<AddressQuery>>,
}

impl StubGeocoder {
    fn answering(postal_code: Option<&str>, locality: Option<&str>, region: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(LocationFields {
                postal_code: postal_code.map(str::to_string),
                locality: locality.map(str::to_string),
                region: region.map(str::to_string),
            }),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodeProvider for StubGeocoder {
    fn name(&self) -> &'static str {
        "StubGeocoder"
    }

    fn source(&self) -> ResolutionSource {
        ResolutionSource::GoogleMaps
    }

    async fn geocode(&self, query: &AddressQuery) -> Result<LocationFields, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        self.answer.clone().map_err(ProviderError::Network)
    }
}

struct StubModel {
    source: ResolutionSource,
    reply: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubModel {
    fn new(source: ResolutionSource, reply: Result<&str, &str>) -> Arc<Self> {
        Arc::new(Self {
            source,
            reply: reply.map(str::to_string).map_err(str::to_string),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn local(reply: &str) -> Arc<Self> {
        Self::new(ResolutionSource::Ollama, Ok(reply))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for StubModel {
    fn name(&self) -> &'static str {
        "StubModel"
    }

    fn source(&self) -> ResolutionSource {
        self.source.clone()
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(ProviderError::Api)
    }
}

fn resolver(geocoder: &Arc<StubGeocoder>, model: &Arc<StubModel>) -> Resolver {
    Resolver::new(
        Some(geocoder.clone() as Arc<dyn GeocodeProvider>),
        Some(model.clone() as Arc<dyn CompletionProvider>),
    )
}

fn fallback_only(model: &Arc<StubModel>) -> Resolver {
    Resolver::new(None, Some(model.clone() as Arc<dyn CompletionProvider>))
}

fn complete_record() -> Record {
    Record::from_pairs([
        ("company", "Acme"),
        ("Service Address", "1000 Market St"),
        ("region", "St. Louis"),
        ("state", "MO"),
        ("zip", "63101"),
    ])
}

fn missing_everything() -> Record {
    Record::from_pairs([("company", "Acme"), ("Service Address", "1000 Market St")])
}

fn location(record: &Record) -> (String, String, String) {
    (
        fields::read(record, LogicalField::PostalCode),
        fields::read(record, LogicalField::Locality),
        fields::read(record, LogicalField::Region),
    )
}

// ============================================================================
// Three-tier resolver
// ============================================================================

#[tokio::test]
async fn test_complete_record_makes_no_calls() {
    let geocoder = StubGeocoder::answering(Some("99999"), Some("Elsewhere"), Some("ZZ"));
    let model = StubModel::local("99999, Elsewhere, ZZ");
    let resolver = resolver(&geocoder, &model);
    let mut record = complete_record();

    let attempt = resolver.resolve(&mut record).await;

    assert!(attempt.is_none());
    assert_eq!(record, complete_record());
    assert_eq!(geocoder.calls(), 0);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_geocoder_fills_everything_and_model_is_skipped() {
    let geocoder = StubGeocoder::answering(Some("63101"), Some("St. Louis"), Some("MO"));
    let model = StubModel::local("00000, Nowhere, XX");
    let resolver = resolver(&geocoder, &model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(geocoder.calls(), 1);
    assert_eq!(model.calls(), 0);
    assert_eq!(attempt.source, ResolutionSource::GoogleMaps);
    assert_eq!(attempt.source.to_string(), "Google Maps");
    assert_eq!(
        location(&record),
        ("63101".to_string(), "St. Louis".to_string(), "MO".to_string())
    );
    assert!(!attempt.has_unresolved());
}

#[tokio::test]
async fn test_geocoder_receives_known_fragments() {
    let geocoder = StubGeocoder::answering(Some("63141"), None, None);
    let model = StubModel::local("");
    let resolver = resolver(&geocoder, &model);
    let mut record = Record::from_pairs([
        ("Service Address", "722 Aramis Drive"),
        ("Service Address City", "Creve Coeur"),
        ("State", "MO"),
        ("Zip", "631"),
    ]);

    resolver.resolve(&mut record).await.unwrap();

    let queries = geocoder.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].to_free_text(), "722 Aramis Drive, Creve Coeur, MO, 631");
    assert_eq!(record.get("Zip"), Some("63141"));
}

#[tokio::test]
async fn test_fallback_without_geocoder() {
    let model = StubModel::local("63101, St. Louis, MO");
    let resolver = fallback_only(&model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(model.calls(), 1);
    assert_eq!(attempt.source, ResolutionSource::Ollama);
    assert_eq!(
        location(&record),
        ("63101".to_string(), "St. Louis".to_string(), "MO".to_string())
    );
    assert_eq!(
        attempt.updated,
        vec![LogicalField::PostalCode, LogicalField::Locality, LogicalField::Region]
    );
}

#[tokio::test]
async fn test_fallback_after_empty_geocode() {
    let geocoder = StubGeocoder::answering(None, None, None);
    let model = StubModel::local("63101, St. Louis, MO");
    let resolver = resolver(&geocoder, &model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(geocoder.calls(), 1);
    assert_eq!(model.calls(), 1);
    assert_eq!(attempt.source, ResolutionSource::Ollama);
    assert_eq!(attempt.calls.len(), 2);
    assert_eq!(attempt.calls[0].provider, "StubGeocoder");
    assert_eq!(attempt.calls[1].provider, "StubModel");
}

#[tokio::test]
async fn test_fallback_prompt_lists_known_fragments() {
    let geocoder = StubGeocoder::answering(Some("63141"), None, None);
    let model = StubModel::local(", Creve Coeur, MO");
    let resolver = resolver(&geocoder, &model);
    let mut record = Record::from_pairs([("Service Address", "722 Aramis Drive")]);

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(
        model.last_prompt().unwrap(),
        "Given the following info, what are the correct ZIP, City, and State?\n\
         Address: 722 Aramis Drive\nCity: \nState: \nZIP: 63141\n\
         Respond as: ZIP, City, State. If unknown, use blank."
    );
    assert_eq!(attempt.source, ResolutionSource::Ollama);
    assert_eq!(
        location(&record),
        ("63141".to_string(), "Creve Coeur".to_string(), "MO".to_string())
    );
}

#[tokio::test]
async fn test_malformed_fallback_reply_is_not_found() {
    let model = StubModel::local("garbage text");
    let resolver = fallback_only(&model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(attempt.source, ResolutionSource::NotFound);
    assert_eq!(attempt.source.to_string(), "Not found");
    assert!(attempt.updated.is_empty());
    assert_eq!(record, missing_everything());
    assert!(matches!(attempt.calls[0].outcome, CallOutcome::Answered(_)));
}

#[tokio::test]
async fn test_invalid_postal_code_in_fallback_is_rejected() {
    let model = StubModel::local("ABCDE, St. Louis, MO");
    let resolver = fallback_only(&model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(
        location(&record),
        (String::new(), "St. Louis".to_string(), "MO".to_string())
    );
    assert!(!record.contains_key("zip"));
    assert_eq!(attempt.source, ResolutionSource::Ollama);
    assert!(attempt.has_unresolved());
}

#[tokio::test]
async fn test_valid_fields_are_never_overwritten() {
    let geocoder = StubGeocoder::answering(Some("63101"), Some("Saint Louis"), Some("Missouri"));
    let model = StubModel::local("00000, Nowhere, XX");
    let resolver = resolver(&geocoder, &model);
    let mut record = Record::from_pairs([
        ("Service Address", "1000 Market St"),
        ("Region", "St. Louis"),
        ("State", "MO"),
        ("Zip", ""),
    ]);

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(record.get("Region"), Some("St. Louis"));
    assert_eq!(record.get("State"), Some("MO"));
    assert_eq!(record.get("Zip"), Some("63101"));
    assert_eq!(attempt.updated, vec![LogicalField::PostalCode]);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_fallback_only_fills_fields_still_missing() {
    let geocoder = StubGeocoder::answering(Some("63101"), None, Some("MO"));
    let model = StubModel::local("99999, St. Louis, IL");
    let resolver = resolver(&geocoder, &model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(
        location(&record),
        ("63101".to_string(), "St. Louis".to_string(), "MO".to_string())
    );
    assert_eq!(attempt.source, ResolutionSource::Ollama);
}

#[tokio::test]
async fn test_consulted_fallback_is_credited_for_geocoder_fields() {
    let geocoder = StubGeocoder::answering(Some("63101"), None, None);
    let model = StubModel::local("garbage text");
    let resolver = resolver(&geocoder, &model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(attempt.calls.len(), 2);
    assert_eq!(attempt.source, ResolutionSource::Ollama);
    assert_eq!(attempt.updated, vec![LogicalField::PostalCode]);
    assert_eq!(
        location(&record),
        ("63101".to_string(), String::new(), String::new())
    );
}

#[tokio::test]
async fn test_partial_geocode_without_fallback_is_google_maps() {
    let geocoder = StubGeocoder::answering(Some("63101"), None, None);
    let resolver = Resolver::new(Some(geocoder.clone() as Arc<dyn GeocodeProvider>), None);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(attempt.source, ResolutionSource::GoogleMaps);
    assert!(attempt.has_unresolved());
}

#[tokio::test]
async fn test_geocode_failure_degrades_to_next_tier() {
    let geocoder = StubGeocoder::failing("connection refused");
    let model = StubModel::local("63088, Valley Park, MO");
    let resolver = resolver(&geocoder, &model);
    let mut record = Record::from_pairs([("Service Address", "519 BENTON ST")]);

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert!(matches!(attempt.calls[0].outcome, CallOutcome::Failed(_)));
    assert_eq!(attempt.source, ResolutionSource::Ollama);
    assert_eq!(record.get("zip"), Some("63088"));
}

#[tokio::test]
async fn test_every_tier_failing_is_not_found() {
    let geocoder = StubGeocoder::failing("quota exceeded");
    let model = StubModel::new(ResolutionSource::Ollama, Err("timed out"));
    let resolver = resolver(&geocoder, &model);
    let mut record = missing_everything();

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(attempt.source, ResolutionSource::NotFound);
    assert_eq!(record, missing_everything());
    assert_eq!(geocoder.calls(), 1);
    assert_eq!(model.calls(), 1);
}

// ============================================================================
// Zip-only resolver
// ============================================================================

fn zip_only(geocoder: Option<&Arc<StubGeocoder>>, cloud: Option<&Arc<StubModel>>) -> ZipOnlyResolver {
    ZipOnlyResolver::new(
        geocoder.map(|g| g.clone() as Arc<dyn GeocodeProvider>),
        cloud.map(|c| c.clone() as Arc<dyn CompletionProvider>),
    )
}

#[tokio::test]
async fn test_zip_only_skips_valid_postal_code() {
    let geocoder = StubGeocoder::answering(Some("99999"), None, None);
    let resolver = zip_only(Some(&geocoder), None);
    let mut record = Record::from_pairs([("Zip", "63101"), ("State", "")]);

    assert!(resolver.resolve(&mut record).await.is_none());
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn test_zip_only_skips_record_without_fragments() {
    let geocoder = StubGeocoder::answering(Some("63101"), None, None);
    let resolver = zip_only(Some(&geocoder), None);
    let mut record = Record::from_pairs([("company", "Acme"), ("zip", "")]);

    assert!(resolver.resolve(&mut record).await.is_none());
    assert_eq!(geocoder.calls(), 0);
}

#[tokio::test]
async fn test_zip_only_uses_cloud_after_geocoder_miss() {
    let geocoder = StubGeocoder::answering(None, Some("St. Louis"), Some("MO"));
    let cloud = StubModel::new(ResolutionSource::OpenAI, Ok("The ZIP code is 63101."));
    let resolver = zip_only(Some(&geocoder), Some(&cloud));
    let mut record = Record::from_pairs([("service_address", "1000 Market St"), ("region", "")]);

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(attempt.source.to_string(), "OpenAI");
    assert_eq!(record.get("zip"), Some("63101"));
    assert_eq!(record.get("region"), Some(""), "zip-only never fills locality");
    assert!(cloud
        .last_prompt()
        .unwrap()
        .starts_with("Given the following info, what is the correct 5-digit ZIP code?"));
}

#[tokio::test]
async fn test_zip_only_cloud_error_is_labelled() {
    let cloud = StubModel::new(ResolutionSource::OpenAI, Err("invalid api key"));
    let resolver = zip_only(None, Some(&cloud));
    let mut record = Record::from_pairs([("State", "MO")]);

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert!(attempt.source.to_string().starts_with("Error: "));
    assert!(attempt.source.to_string().contains("invalid api key"));
    assert!(!record.contains_key("zip"));
}

#[tokio::test]
async fn test_zip_only_geocoder_hit_skips_cloud() {
    let geocoder = StubGeocoder::answering(Some("63088"), None, None);
    let cloud = StubModel::new(ResolutionSource::OpenAI, Ok("99999"));
    let resolver = zip_only(Some(&geocoder), Some(&cloud));
    let mut record = Record::from_pairs([("Service Address", "519 BENTON ST"), ("Zip", "6308")]);

    let attempt = resolver.resolve(&mut record).await.unwrap();

    assert_eq!(attempt.source, ResolutionSource::GoogleMaps);
    assert_eq!(record.get("Zip"), Some("63088"));
    assert_eq!(cloud.calls(), 0);
}

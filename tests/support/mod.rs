//! Shared test doubles for the export service

use async_trait::async_trait;
use chrono::NaiveDate;
use finam_data_downloader::downloader::{ExportConfig, Exporter};
use finam_data_downloader::fetcher::{Fetcher, FetcherError, FetcherResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub const LANDING: &str =
    r#"<html><head><script src="/cache/icharts/icharts.js" type="text/javascript"></script></head></html>"#;

pub const META: &str = "var aEmitentIds = [3,16842,-1,81820,175924];\n\
    var aEmitentNames = ['Сбербанк','Газпром','Category','ГАЗПРОМ ао','Фьючерс RTS'];\n\
    var aEmitentCodes = ['SBER','GAZP','CAT','GAZP','RIH0'];\n\
    var aEmitentMarkets = [1,1,-1,14,14];\n";

pub const CANDLE_HEADER: &str = "<DATE>;<TIME>;<OPEN>;<HIGH>;<LOW>;<CLOSE>;<VOL>";
pub const TICK_HEADER: &str = "<TICKER>;<PER>;<DATE>;<TIME>;<LAST>;<VOL>";

pub const IN_PROGRESS: &str = "Система уже обрабатывает Ваш запрос. Пожалуйста, подождите.";
pub const THROTTLED: &str = "Forbidden: Access is denied";
pub const TOO_LONG: &str = "Вы запросили данные за слишком большой временной период.";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Serves the landing page and metadata script, counting requests
#[derive(Default)]
pub struct MetaFetcher {
    calls: AtomicUsize,
}

impl MetaFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MetaFetcher {
    async fn fetch(&self, url: &str) -> FetcherResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.ends_with("icharts.js") {
            Ok(META.to_string())
        } else {
            Ok(LANDING.to_string())
        }
    }
}

/// Replays scripted responses and records each requested URL with its time
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<FetcherResult<String>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = FetcherResult<String>>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(bodies.into_iter().map(|b| Ok(b.into())))
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> FetcherResult<String> {
        self.calls.lock().unwrap().push((url.to_string(), Instant::now()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetcherError::Decode(format!("no scripted response for {url}"))))
    }
}

/// Exporter wired to the given data fetcher and a fresh metadata stub
pub fn exporter(data: Arc<ScriptedFetcher>) -> (Exporter, Arc<MetaFetcher>) {
    let meta = Arc::new(MetaFetcher::default());
    let exporter = Exporter::with_fetchers(ExportConfig::default(), data, meta.clone());
    (exporter, meta)
}

/// Query parameter value from a requested URL
pub fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

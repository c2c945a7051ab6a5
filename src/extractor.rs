use scraper::{Html, Selector};
use serde::Deserialize;
use crate::error::{Result, ScraperError};

const MIN_IMAGE_URL_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub page_url: String,
    pub image_url: String,
}

impl ImageCandidate {
    pub fn has_usable_image(&self) -> bool {
        self.image_url.len() > MIN_IMAGE_URL_LEN
    }
}

#[derive(Debug, Deserialize)]
struct CandidatePayload {
    #[serde(default)]
    purl: Option<String>,
    #[serde(default)]
    murl: Option<String>,
    #[serde(default)]
    turl: Option<String>,
}

pub struct Extractor {
    result_selector: Selector,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        let result_selector = Selector::parse("a.iusc")
            .map_err(|e| ScraperError::Decode(format!("invalid result selector: {:?}", e)))?;
        Ok(Extractor { result_selector })
    }

    pub fn extract_payloads(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.result_selector)
            .filter_map(|element| element.value().attr("m"))
            .map(|payload| payload.to_string())
            .collect()
    }
}

pub fn decode_candidate(payload: &str) -> Result<ImageCandidate> {
    let data: CandidatePayload = serde_json::from_str(payload)
        .map_err(|e| ScraperError::Decode(e.to_string()))?;

    let image_url = [data.murl, data.turl]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty())
        .unwrap_or_default();

    Ok(ImageCandidate {
        page_url: data.purl.unwrap_or_default(),
        image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_payloads_from_result_anchors() {
        let html = r#"
            <html><body>
              <a class="iusc" m='{"purl":"https://shop.example.com/p/1","murl":"https://img.example.com/full/1.jpg"}'>1</a>
              <a class="other" m='{"purl":"https://ignored.example.com"}'>x</a>
              <a class="iusc">no payload</a>
              <a class="iusc" m='{"purl":"https://b.example.com/p/2"}'>2</a>
            </body></html>
        "#;
        let extractor = Extractor::new().unwrap();
        let payloads = extractor.extract_payloads(html);
        assert_eq!(payloads.len(), 2);
        assert!(payloads[0].contains("shop.example.com"));
    }

    #[test]
    fn decodes_full_image_url_first() {
        let c = decode_candidate(
            r#"{"purl":"https://shop.example.com/p","murl":"https://img.example.com/full.jpg","turl":"https://tse.example.com/th"}"#,
        )
        .unwrap();
        assert_eq!(c.page_url, "https://shop.example.com/p");
        assert_eq!(c.image_url, "https://img.example.com/full.jpg");
        assert!(c.has_usable_image());
    }

    #[test]
    fn falls_back_to_thumbnail() {
        let c = decode_candidate(r#"{"purl":"https://a.example.com","murl":"","turl":"https://tse.example.com/th?id=123"}"#)
            .unwrap();
        assert_eq!(c.image_url, "https://tse.example.com/th?id=123");
    }

    #[test]
    fn short_image_urls_are_unusable() {
        let c = decode_candidate(r#"{"purl":"https://a.example.com","murl":"http://x.io/a.png"}"#).unwrap();
        assert!(!c.has_usable_image());
        let c = decode_candidate(r#"{"purl":"https://a.example.com"}"#).unwrap();
        assert_eq!(c.image_url, "");
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        assert!(matches!(decode_candidate("{not json"), Err(ScraperError::Decode(_))));
    }
}

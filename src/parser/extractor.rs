use anyhow::Result;
use tracing::{debug, warn};

use super::document::Document;
use super::record::Record;
use super::rule::FieldRule;
use crate::errlog::{Failure, FailureSink};

/// A record plus the failures met while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub record: Record,
    pub failures: Vec<Failure>,
}

/// Runs every rule once, in order, against `doc`.
///
/// A failing rule leaves its field(s) absent and adds one failure; it never
/// stops the rules after it. The record always carries exactly `schema`.
pub fn extract<D>(doc: &mut D, schema: &[&'static str], rules: &[FieldRule]) -> Extraction
where
    D: Document + ?Sized,
{
    let mut record = Record::empty(schema);
    let mut failures = Vec::new();

    for rule in rules {
        let names = rule.fields.names();
        if let Some(unknown) = names.iter().find(|n| !record.has_field(n)) {
            warn!(field = %unknown, rule = %rule.fields, "Rule targets a field outside the schema, skipped");
            continue;
        }

        match rule.evaluate(doc) {
            Ok(values) => {
                for (name, value) in names.into_iter().zip(values) {
                    record.set(name, value);
                }
            }
            Err(err) => {
                debug!(url = doc.url(), field = %rule.fields, error = %err, "Field rule failed");
                failures.push(Failure::field(doc.url(), rule.fields, &err));
            }
        }
    }

    Extraction { record, failures }
}

/// [`extract`], then every failure handed to `sink`.
///
/// Only a sink error is returned.
pub fn extract_into<D, S>(
    doc: &mut D,
    schema: &[&'static str],
    rules: &[FieldRule],
    sink: &mut S,
) -> Result<Extraction>
where
    D: Document + ?Sized,
    S: FailureSink + ?Sized,
{
    let out = extract(doc, schema, rules);
    for failure in &out.failures {
        warn!(url = %failure.url, field = %failure.field, "{}", failure.detail);
        sink.record(failure)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::document::{HtmlDocument, Locator, Probe, Query};
    use crate::parser::product::product_rules;
    use crate::error::ExtractError;
    use crate::parser::record::{Value, PRODUCT_FIELDS};
    use crate::parser::rule::{Action, Fields, Source};

    const MINI3_URL: &str = "https://store.dji.com/nl/product/dji-mini-3";

    fn fixture(name: &str, url: &str) -> HtmlDocument {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        HtmlDocument::parse(url, &html)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| s.to_string()).collect())
    }

    fn assert_schema(record: &Record) {
        assert_eq!(record.names().collect::<Vec<_>>(), PRODUCT_FIELDS.to_vec());
    }

    #[test]
    fn full_product_page() {
        let mut doc = fixture("mini3", MINI3_URL);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &product_rules());
        assert!(out.failures.is_empty(), "unexpected failures: {:?}", out.failures);

        let r = &out.record;
        assert_schema(r);
        assert_eq!(r.present(), PRODUCT_FIELDS.len());
        assert_eq!(r.get("title"), Some(&text("DJI Mini 3")));
        assert_eq!(r.get("price"), Some(&text("1,299")));
        assert_eq!(r.get("product_url"), Some(&text(MINI3_URL)));
        assert_eq!(r.get("ean"), Some(&text("6941565950001")));
        assert_eq!(
            r.get("highlights"),
            Some(&list(&["Under 249 g", "4K HDR video", "38 min flight time"]))
        );
        assert_eq!(
            r.get("main_image_urls"),
            Some(&list(&["https://cdn.example/mini3/1.jpg", "https://cdn.example/mini3/2.jpg"]))
        );
        assert_eq!(
            r.get("description_images"),
            Some(&list(&[
                "https://cdn.example/mini3/detail-1.jpg",
                "https://cdn.example/mini3/detail-2.jpg"
            ]))
        );
        assert_eq!(
            r.get("description_text_title"),
            Some(&list(&["Mini-sized", "True vertical shooting"]))
        );
        assert_eq!(
            r.get("box_descriptions"),
            Some(&list(&["Aircraft × 1", "Remote Controller × 1"]))
        );
        assert_eq!(
            r.get("questions"),
            Some(&list(&["Does it need registration?", "Is there a warranty?"]))
        );
        assert_eq!(
            r.get("answers"),
            Some(&list(&["No, it weighs under 250 g.", "Yes, one year."]))
        );
        assert_eq!(
            r.get("closer_look_name"),
            Some(&list(&["Takeoff Weight", "Max Flight Time"]))
        );
        assert_eq!(r.get("closer_look_value"), Some(&list(&["249 g", "38 minutes"])));
    }

    #[test]
    fn partial_page_isolates_each_failure() {
        let url = "https://store.dji.com/nl/product/mini-3-propellers";
        let mut doc = fixture("accessory", url);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &product_rules());
        let r = &out.record;

        assert_schema(r);
        assert_eq!(r.get("title"), Some(&text("DJI Mini 3 Propellers")));
        assert_eq!(r.get("product_url"), Some(&text(url)));
        assert_eq!(r.get("main_image_urls"), Some(&list(&["https://cdn.example/props/1.jpg"])));
        for absent in ["price", "ean", "highlights", "description_images", "box_images", "box_descriptions", "questions", "answers"] {
            assert_eq!(r.get(absent), None, "{} should be absent", absent);
        }
        // An empty spec table is still a value.
        assert_eq!(r.get("closer_look_name"), Some(&list(&[])));

        let failed: Vec<&str> = out.failures.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            failed,
            vec![
                "price",
                "ean",
                "highlights",
                "description_images",
                "description_text_title/description_text",
                "box_images/box_descriptions",
                "questions/answers",
            ]
        );
        assert!(out.failures.iter().all(|f| f.url == url));
    }

    #[test]
    fn missing_price_only_touches_price() {
        let html = std::fs::read_to_string("tests/fixtures/mini3.html")
            .unwrap()
            .replace("style__price", "style__cost");
        let mut doc = HtmlDocument::parse(MINI3_URL, &html);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &product_rules());

        assert_eq!(out.record.get("price"), None);
        assert_eq!(out.record.present(), PRODUCT_FIELDS.len() - 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].url, MINI3_URL);
        assert_eq!(out.failures[0].field, "price");
    }

    #[test]
    fn empty_rule_list() {
        let mut doc = fixture("mini3", MINI3_URL);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &[]);
        assert_schema(&out.record);
        assert_eq!(out.record.present(), 0);
        assert!(out.failures.is_empty());
    }

    #[test]
    fn idempotent_on_a_static_page() {
        let rules = product_rules();
        let mut doc = fixture("mini3", MINI3_URL);
        let first = extract(&mut doc, &PRODUCT_FIELDS, &rules);
        let second = extract(&mut doc, &PRODUCT_FIELDS, &rules);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_fields_never_become_keys() {
        let rules = vec![
            FieldRule::new(Fields::One("colour"), Source::First(Query::text(Locator::Css("h1")))),
            FieldRule::new(Fields::Pair("title", "subtitle"), Source::PageUrl),
            FieldRule::new(Fields::One("title"), Source::First(Query::text(Locator::Css("h1")))),
        ];
        let mut doc = fixture("mini3", MINI3_URL);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &rules);
        assert_schema(&out.record);
        assert_eq!(out.record.present(), 1);
        assert!(out.failures.is_empty());
    }

    #[test]
    fn compound_rule_fails_as_one_unit() {
        let rules = vec![FieldRule::new(
            Fields::Pair("questions", "answers"),
            Source::Rows {
                rows: Locator::Css("section[class*='faq'] li"),
                key: Probe { locator: Locator::Css("h5 > span"), target: crate::parser::document::Target::Text },
                value: Probe { locator: Locator::Css("aside"), target: crate::parser::document::Target::Text },
                unique_keys: false,
            },
        )];
        let mut doc = fixture("mini3", MINI3_URL);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &rules);
        assert_eq!(out.record.get("questions"), None);
        assert_eq!(out.record.get("answers"), None);
        assert_eq!(out.failures.len(), 1);
    }

    #[test]
    fn description_blocks_without_text_keep_both_lists() {
        let html = r#"<html><body>
            <h3>Take a Closer Look</h3>
            <div class="index__desc___a"><h4>Mini-sized</h4><p>Weighs less.</p></div>
            <div class="index__desc___a"><h4>Vertical</h4></div>
        </body></html>"#;
        let mut doc = HtmlDocument::parse(MINI3_URL, html);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &product_rules());

        assert_eq!(out.record.get("description_text_title"), Some(&list(&["Mini-sized", "Vertical"])));
        assert_eq!(out.record.get("description_text"), Some(&list(&["Weighs less."])));
        assert!(out.failures.iter().all(|f| f.field != "description_text_title/description_text"));
    }

    #[test]
    fn compound_rule_with_a_plain_value_is_a_shape_failure() {
        let rules = vec![FieldRule::new(Fields::Pair("questions", "answers"), Source::PageUrl)];
        let mut doc = fixture("mini3", MINI3_URL);
        let out = extract(&mut doc, &PRODUCT_FIELDS, &rules);
        assert_eq!(out.record.present(), 0);
        assert_eq!(out.failures[0].kind, crate::error::FailureKind::Shape);
    }

    /// Counts navigation calls so rules can be checked for their own preconditions.
    struct Tracked {
        inner: HtmlDocument,
        scrolls: Vec<String>,
        activations: usize,
    }

    impl Document for Tracked {
        fn url(&self) -> &str {
            self.inner.url()
        }
        fn read_all(&self, query: &Query) -> Result<Vec<String>, ExtractError> {
            self.inner.read_all(query)
        }
        fn read_rows(&self, rows: &Locator, cells: &[Probe]) -> Result<Vec<Vec<String>>, ExtractError> {
            self.inner.read_rows(rows, cells)
        }
        fn scroll_into_view(&mut self, locator: &Locator) -> Result<(), ExtractError> {
            self.scrolls.push(locator.to_string());
            self.inner.scroll_into_view(locator)
        }
        fn activate_each(&mut self, rows: &Locator, handle: &Locator) -> Result<(), ExtractError> {
            self.activations += 1;
            self.inner.activate_each(rows, handle)
        }
    }

    #[test]
    fn every_rule_runs_its_own_navigation() {
        let mut doc = Tracked { inner: fixture("mini3", MINI3_URL), scrolls: Vec::new(), activations: 0 };
        extract(&mut doc, &PRODUCT_FIELDS, &product_rules());
        assert_eq!(
            doc.scrolls,
            vec![
                "<h3> 'Take a Closer Look'",
                "<h3> 'Take a Closer Look'",
                "<h3> 'In the Box'",
                "<h3> 'Let’s Answer Your Questions'",
            ]
        );
        assert_eq!(doc.activations, 1);
    }

    #[test]
    fn failed_scroll_skips_activation() {
        let rule = FieldRule::new(Fields::One("questions"), Source::PageUrl)
            .prepare(Action::ScrollIntoView(Locator::Text { tag: "h3", text: "Nope" }))
            .prepare(Action::ActivateEach { rows: Locator::Css("li"), handle: Locator::Css("span") });
        let mut doc = Tracked { inner: fixture("mini3", MINI3_URL), scrolls: Vec::new(), activations: 0 };
        let out = extract(&mut doc, &PRODUCT_FIELDS, &[rule]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(doc.activations, 0);
    }

    #[test]
    fn extract_into_forwards_failures() {
        let html = "<html><body><h1>Bare</h1></body></html>";
        let mut doc = HtmlDocument::parse("https://store.example/product/bare", html);
        let mut sink: Vec<Failure> = Vec::new();
        let out = extract_into(&mut doc, &PRODUCT_FIELDS, &product_rules(), &mut sink).unwrap();

        assert_eq!(out.record.get("title"), Some(&text("Bare")));
        assert_eq!(sink, out.failures);
        assert!(!sink.is_empty());
        assert!(sink.iter().all(|f| f.url == "https://store.example/product/bare"));
        // one entry per failing rule, never per field
        assert_eq!(sink.iter().filter(|f| f.field.contains("questions")).count(), 1);
    }
}

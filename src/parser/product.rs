use super::document::{Locator, Probe, Query, Target};
use super::rule::{Action, FieldRule, Fields, Source};

const CLOSER_LOOK_HEADING: Locator = Locator::Text { tag: "h3", text: "Take a Closer Look" };
const IN_THE_BOX_HEADING: Locator = Locator::Text { tag: "h3", text: "In the Box" };
const FAQ_HEADING: Locator = Locator::Text { tag: "h3", text: "Let’s Answer Your Questions" };

const FAQ_ITEM: Locator = Locator::Css("section[class*='faq'] li");
const FAQ_TOGGLE: Locator = Locator::Css("h5 > span");

/// Store product page rules, in run order.
///
/// Each rule carries its own scroll/reveal steps even when an earlier rule
/// already moved the page there.
pub fn product_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new(Fields::One("title"), Source::First(Query::text(Locator::Css("h1")))),
        FieldRule::new(
            Fields::One("price"),
            Source::First(Query::text(Locator::Css("[class*='style__price']"))),
        )
        .strip(&[" ", "€"]),
        FieldRule::new(Fields::One("product_url"), Source::PageUrl),
        FieldRule::new(
            Fields::One("ean"),
            Source::First(Query::attr(Locator::Css("meta[name='ean']"), "content")),
        )
        .strip(&["EAN"]),
        // The first benefit list is the promo banner; highlights live in the second.
        FieldRule::new(
            Fields::One("highlights"),
            Source::All(
                Query::text(Locator::Css("li"))
                    .within(Locator::Css("ul[class*='eventBenefitItem__event-benefit']"), 1),
            ),
        ),
        FieldRule::new(
            Fields::One("main_image_urls"),
            Source::All(Query::attr(Locator::Css("a[role='presentation'] > img"), "src")),
        ),
        FieldRule::new(
            Fields::One("description_images"),
            Source::All(Query::attr(Locator::Css("div[class*='index__img-box'] > img"), "src")),
        )
        .prepare(Action::ScrollIntoView(CLOSER_LOOK_HEADING)),
        FieldRule::new(
            Fields::Pair("description_text_title", "description_text"),
            Source::Parallel(
                Query::text(Locator::Css("div[class*='index__desc__'] > h4")),
                Query::text(Locator::Css("div[class*='index__desc__'] > p")),
            ),
        )
        .prepare(Action::ScrollIntoView(CLOSER_LOOK_HEADING)),
        FieldRule::new(
            Fields::Pair("box_images", "box_descriptions"),
            Source::Rows {
                rows: Locator::Css("li[data-test-locator='sectionInTheBoxItem']"),
                key: Probe {
                    locator: Locator::Css("div:nth-child(1) > span > img"),
                    target: Target::Attr("src"),
                },
                value: text_probe("div:nth-child(2) > p"),
                unique_keys: false,
            },
        )
        .prepare(Action::ScrollIntoView(IN_THE_BOX_HEADING)),
        FieldRule::new(
            Fields::Pair("questions", "answers"),
            Source::Rows {
                rows: FAQ_ITEM,
                key: text_probe("h5 > span"),
                value: text_probe("article"),
                unique_keys: false,
            },
        )
        .prepare(Action::ScrollIntoView(FAQ_HEADING))
        .prepare(Action::ActivateEach { rows: FAQ_ITEM, handle: FAQ_TOGGLE }),
        FieldRule::new(
            Fields::Pair("closer_look_name", "closer_look_value"),
            Source::Rows {
                rows: Locator::Css(".temp-specs-tbody .temp-specs-tr"),
                key: text_probe(".temp-specs-td.name"),
                value: text_probe(".temp-specs-td.value"),
                unique_keys: true,
            },
        ),
    ]
}

fn text_probe(css: &'static str) -> Probe {
    Probe { locator: Locator::Css(css), target: Target::Text }
}

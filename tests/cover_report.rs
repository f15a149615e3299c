use std::sync::Arc;

use book_cover_match::lookup::LookupFuture;
use book_cover_match::ocr::{self, OcrFuture};
use book_cover_match::{
    BookLookupProvider, BookLookupResult, Catalog, CoverAnalysis, CoverMatcher, OcrProvider,
    RequestContext, format_report,
};
use tokio_util::sync::CancellationToken;

const COVER_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
5\t1\t1\t1\t1\t1\t100\t50\t400\t110\t95.1\tDune
5\t1\t1\t1\t2\t1\t100\t200\t200\t80\t93.0\tFrank
5\t1\t1\t1\t2\t2\t320\t200\t240\t80\t92.4\tHerbert
5\t1\t2\t1\t1\t1\t100\t700\t150\t20\t90.0\tBestselling
5\t1\t2\t1\t1\t2\t260\t700\t100\t20\t88.7\tclassic
";

const CATALOG_TOML: &str = r#"
[[books]]
id = 1
title = "Dune"
author = "Frank Herbert"

[[books]]
id = 2
title = "Dune Messiah"
author = "Frank Herbert"

[[books]]
id = 3
title = "Emma"
author = "Jane Austen"
"#;

struct TsvOcr(&'static str);

impl OcrProvider for TsvOcr {
    fn analyze_cover_image<'a>(&'a self, _image: &'a [u8], _content_type: &'a str) -> OcrFuture<'a> {
        Box::pin(async move { ocr::analyze_tsv(self.0, 0.5) })
    }
}

struct FixedLookup(Vec<BookLookupResult>);

impl BookLookupProvider for FixedLookup {
    fn search_books_by_text<'a>(&'a self, _query: &'a str) -> LookupFuture<'a> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

fn matcher(tsv: &'static str) -> CoverMatcher {
    let catalog = Catalog::parse(CATALOG_TOML).expect("catalog");
    let lookup = FixedLookup(vec![
        BookLookupResult::new("Dune", "Frank Herbert")
            .with_thumbnail("https://covers.openlibrary.org/b/id/1-M.jpg"),
        BookLookupResult::new("Children of Dune", "Frank Herbert"),
    ]);
    CoverMatcher::new(Arc::new(TsvOcr(tsv)), Arc::new(lookup)).with_catalog(Arc::new(catalog))
}

#[tokio::test]
async fn cover_report_snapshot() {
    let output = matcher(COVER_TSV)
        .analyze(
            b"cover",
            "image/png",
            &RequestContext::new("dune.png"),
            &CancellationToken::new(),
        )
        .await
        .expect("analysis");
    insta::assert_snapshot!(format_report(&output), @r"
status: success
extracted: Dune Frank Herbert Bestselling classic
filtered: Dune Frank Herbert
exact match: #1 Dune / Frank Herbert
candidates:
  1.000  #1 Dune / Frank Herbert
  0.750  #2 Dune Messiah / Frank Herbert
  0.600  Children of Dune / Frank Herbert
");
}

#[tokio::test]
async fn unreadable_cover_reports_failure() {
    let header_only = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n";
    let output = matcher(header_only)
        .analyze(
            b"cover",
            "image/png",
            &RequestContext::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("analysis");
    assert!(matches!(output.analysis, CoverAnalysis::Failure { .. }));
    insta::assert_json_snapshot!(output, @r#"
{
  "analysis": {
    "status": "failure",
    "reason": "no text recognized on cover"
  },
  "matched_books": [],
  "exact_match": null
}
"#);
}

//! Scarborough (UTSC) adapter: a POST-form JSON API lists each department's
//! courses, then one calendar HTML page per course carries the description
//! and requirement text.

use std::collections::BTreeMap;

use async_trait::async_trait;
use coursegraph_core::{Campus, RawCourseRecord};
use coursegraph_storage::HttpFetcher;
use scraper::Html;
use serde_json::Value as JsonValue;
use serde::Deserialize;

use crate::{
    labelled_div_sibling_text, select_first_text, AdapterError, CampusSource, MineContext,
};

#[derive(Debug, Clone, Deserialize)]
pub struct UtscSource {
    pub api_url: String,
    pub calendar_url: String,
    /// Departments are addressed by index, department_first..=department_last.
    pub department_first: u32,
    pub department_last: u32,
}

const DESCRIPTION_SELECTOR: &str =
    "div.field.field-name-body.field-type-text-with-summary.field-label-hidden";

/// Parse a department listing response: a JSON array whose first element
/// maps an opaque key to `{course_cd, title}` entries.
pub fn parse_department_listing(body: &str) -> Result<Vec<(String, String)>, AdapterError> {
    let value: JsonValue = serde_json::from_str(body)?;
    let mut out = Vec::new();

    let Some(entries) = value.as_array().and_then(|a| a.first()).and_then(|v| v.as_object())
    else {
        return Ok(out);
    };

    for entry in entries.values() {
        let Some(course_cd) = entry.get("course_cd").and_then(|v| v.as_str()) else {
            continue;
        };
        let title = entry
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        out.push((course_cd.to_string(), title.trim().to_string()));
    }

    Ok(out)
}

/// Detail fields scraped from one calendar course page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoursePageDetails {
    pub description: Option<String>,
    pub prerequisites: Option<String>,
    pub corequisites: Option<String>,
    pub exclusions: Option<String>,
}

pub fn parse_course_page(body: &str) -> Result<CoursePageDetails, AdapterError> {
    let document = Html::parse_document(body);
    Ok(CoursePageDetails {
        description: select_first_text(&document, DESCRIPTION_SELECTOR)?,
        prerequisites: labelled_div_sibling_text(&document, "Prerequisite:")?,
        corequisites: labelled_div_sibling_text(&document, "Corequisite:")?,
        exclusions: labelled_div_sibling_text(&document, "Exclusion:")?,
    })
}

impl UtscSource {
    fn course_url(&self, course_cd: &str) -> String {
        format!("{}/{}", self.calendar_url.trim_end_matches('/'), course_cd)
    }
}

#[async_trait]
impl CampusSource for UtscSource {
    fn campus(&self) -> Campus {
        Campus::Utsc
    }

    async fn mine(
        &self,
        http: &HttpFetcher,
        ctx: &MineContext,
    ) -> Result<BTreeMap<String, RawCourseRecord>, AdapterError> {
        let mut courses = BTreeMap::new();

        for department in self.department_first..=self.department_last {
            let form = [("departments[]", department.to_string())];
            let body = http
                .post_form_text(ctx.run_id, Campus::Utsc, &self.api_url, &form)
                .await?;

            for (course_cd, title) in parse_department_listing(&body)? {
                if courses.contains_key(&course_cd) {
                    continue;
                }

                let page = http
                    .fetch_text(ctx.run_id, Campus::Utsc, &self.course_url(&course_cd))
                    .await?;
                let details = parse_course_page(&page)?;

                courses.insert(
                    course_cd,
                    RawCourseRecord {
                        title,
                        description: details.description,
                        prerequisites: details.prerequisites,
                        corequisites: details.corequisites,
                        exclusions: details.exclusions,
                    },
                );
            }
        }

        Ok(courses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPARTMENT_LISTING: &str = r#"[
        {
            "0": {"course_cd": "CSCA08H3", "title": "Introduction to Computer Science I"},
            "1": {"course_cd": "CSCA48H3", "title": "Introduction to Computer Science II"},
            "2": {"note": "entry without a course code"}
        },
        {"unused": "second element is ignored"}
    ]"#;

    const COURSE_PAGE: &str = r#"
    <html><body>
      <div class="field field-name-body field-type-text-with-summary field-label-hidden">
        <p>An introduction to software design and development.</p>
      </div>
      <div>Prerequisite:</div>
      <div>CSCA08H3</div>
      <div>Exclusion:</div>
      <div>CSC108H1, CSC148H1</div>
    </body></html>
    "#;

    #[test]
    fn department_listing_yields_code_title_pairs() {
        let listing = parse_department_listing(DEPARTMENT_LISTING).unwrap();
        assert_eq!(
            listing,
            vec![
                (
                    "CSCA08H3".to_string(),
                    "Introduction to Computer Science I".to_string()
                ),
                (
                    "CSCA48H3".to_string(),
                    "Introduction to Computer Science II".to_string()
                ),
            ]
        );
    }

    #[test]
    fn empty_department_response_is_empty() {
        assert!(parse_department_listing("[]").unwrap().is_empty());
        assert!(parse_department_listing("[{}]").unwrap().is_empty());
    }

    #[test]
    fn course_page_details_are_scraped_from_labelled_divs() {
        let details = parse_course_page(COURSE_PAGE).unwrap();
        assert_eq!(
            details.description.as_deref(),
            Some("An introduction to software design and development.")
        );
        assert_eq!(details.prerequisites.as_deref(), Some("CSCA08H3"));
        assert_eq!(details.corequisites, None);
        assert_eq!(details.exclusions.as_deref(), Some("CSC108H1, CSC148H1"));
    }

    #[test]
    fn course_url_joins_calendar_base_and_code() {
        let source = UtscSource {
            api_url: "https://timetable.example/api.php".to_string(),
            calendar_url: "https://calendar.example/course/".to_string(),
            department_first: 2,
            department_last: 3,
        };
        assert_eq!(
            source.course_url("CSCA08H3"),
            "https://calendar.example/course/CSCA08H3"
        );
    }
}

//! St. George (UTSG) adapter: the Arts & Science timetable JSON API,
//! one request per org/subject code.

use std::collections::BTreeMap;

use async_trait::async_trait;
use coursegraph_core::{Campus, RawCourseRecord};
use coursegraph_storage::HttpFetcher;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::{fragment_text, text_or_none, AdapterError, CampusSource, MineContext};

#[derive(Debug, Clone, Deserialize)]
pub struct UtsgSource {
    pub api_url: String,
    pub session: String,
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiCourse {
    code: String,
    #[serde(rename = "courseTitle")]
    course_title: String,
    #[serde(rename = "courseDescription", default)]
    course_description: Option<String>,
    #[serde(default)]
    exclusion: Option<String>,
    #[serde(default)]
    prerequisite: Option<String>,
    #[serde(default)]
    corequisite: Option<String>,
}

/// Parse one org's API response. The API answers an object keyed by
/// section identifier, or an empty array when the org offers nothing this
/// session. Duplicate course codes across sections keep the first record.
pub fn parse_subject_listing(
    body: &str,
) -> Result<BTreeMap<String, RawCourseRecord>, AdapterError> {
    let value: JsonValue = serde_json::from_str(body)?;
    let mut out = BTreeMap::new();

    let JsonValue::Object(entries) = value else {
        return Ok(out);
    };

    for (_section, entry) in entries {
        let course: ApiCourse = serde_json::from_value(entry)?;
        if out.contains_key(&course.code) {
            continue;
        }

        // Descriptions arrive as HTML markup embedded in the JSON.
        let description = course.course_description.as_deref().and_then(fragment_text);

        out.insert(
            course.code.clone(),
            RawCourseRecord {
                title: course.course_title.trim().to_string(),
                description,
                prerequisites: course.prerequisite.and_then(text_or_none),
                corequisites: course.corequisite.and_then(text_or_none),
                exclusions: course.exclusion.and_then(text_or_none),
            },
        );
    }

    Ok(out)
}

impl UtsgSource {
    fn subject_url(&self, subject: &str) -> String {
        format!("{}/{}/courses?org={}", self.api_url, self.session, subject)
    }
}

#[async_trait]
impl CampusSource for UtsgSource {
    fn campus(&self) -> Campus {
        Campus::Utsg
    }

    async fn mine(
        &self,
        http: &HttpFetcher,
        ctx: &MineContext,
    ) -> Result<BTreeMap<String, RawCourseRecord>, AdapterError> {
        let mut courses = BTreeMap::new();

        for subject in &self.subjects {
            let url = self.subject_url(subject);
            let body = http.fetch_text(ctx.run_id, Campus::Utsg, &url).await?;
            for (code, record) in parse_subject_listing(&body)? {
                courses.entry(code).or_insert(record);
            }
        }

        Ok(courses)
    }
}

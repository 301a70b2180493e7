//! Plain-text export of a run's artifacts.

use crate::context::ArtifactState;
use crate::core::StageId;

/// Report sections in export order, with their headings.
pub const REPORT_SECTIONS: [(StageId, &str); 6] = [
    (StageId::Content, "User_Stories"),
    (StageId::Design, "Design Document"),
    (StageId::Code, "Generated Code"),
    (StageId::Test, "Test Cases"),
    (StageId::Qa, "QA Testing"),
    (StageId::Security, "Security Review"),
];

/// Renders the six artifacts as one document.
///
/// Each section is its heading, a newline, a space and the artifact.
/// Sections are separated by a blank line; a stage without an artifact
/// renders as an empty section.
///
/// ```
/// use reviewflow::context::{ArtifactState, StateUpdate};
/// use reviewflow::core::StageId;
/// use reviewflow::report::render_report;
///
/// let mut state = ArtifactState::new("todo app");
/// state.merge(&StateUpdate::new().artifact(StageId::Content, "As a user..."));
/// assert!(render_report(&state).starts_with("User_Stories\n As a user...\n\n"));
/// ```
#[must_use]
pub fn render_report(state: &ArtifactState) -> String {
    REPORT_SECTIONS
        .iter()
        .map(|(stage, heading)| {
            let artifact = state.artifact(*stage).unwrap_or_default();
            format!("{heading}\n {artifact}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StateUpdate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_report_order() {
        let mut state = ArtifactState::new("t");
        for stage in StageId::ALL {
            state.merge(&StateUpdate::new().artifact(stage, format!("<{stage}>")));
        }

        assert_eq!(
            render_report(&state),
            "User_Stories\n <Content>\n\n\
             Design Document\n <Design>\n\n\
             Generated Code\n <Code>\n\n\
             Test Cases\n <Test>\n\n\
             QA Testing\n <QA>\n\n\
             Security Review\n <Security>"
        );
    }

    #[test]
    fn test_missing_artifacts_render_empty() {
        let report = render_report(&ArtifactState::new("t"));
        assert!(report.starts_with("User_Stories\n \n\nDesign Document\n "));
        assert_eq!(report.matches("\n\n").count(), 5);
    }
}

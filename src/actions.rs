/* ================= REPLY ACTION BAR ================= */

pub const MOCK_SHARE_URL: &str = "https://sheetchat.app/share/mock-id-123";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyAction {
    ThumbsUp,
    ThumbsDown,
    Copy,
    Share,
    ExportPdf,
    ExportPptx,
}

/// What the UI has to do once an action button is pressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionEffect {
    pub log: &'static str,
    pub alert: Option<String>,
    pub clipboard: Option<String>,
}

impl ReplyAction {
    pub const ALL: [Self; 6] = [
        Self::ThumbsUp,
        Self::ThumbsDown,
        Self::Copy,
        Self::Share,
        Self::ExportPdf,
        Self::ExportPptx,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ThumbsUp => "thumbsUp",
            Self::ThumbsDown => "thumbsDown",
            Self::Copy => "copy",
            Self::Share => "share",
            Self::ExportPdf => "pdf",
            Self::ExportPptx => "pptx",
        }
    }

    /// Inline SVG markup for the button.
    pub fn icon(self) -> &'static str {
        match self {
            Self::ThumbsUp => r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M14 9V5a3 3 0 0 0-3-3l-4 9v11h11.28a2 2 0 0 0 2-1.7l1.38-9a2 2 0 0 0-2-2.3zM7 22H4a2 2 0 0 1-2-2v-7a2 2 0 0 1 2-2h3"></path></svg>"#,
            Self::ThumbsDown => r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M10 15v4a3 3 0 0 0 3 3l4-9V2H5.72a2 2 0 0 0-2 1.7l-1.38 9a2 2 0 0 0 2 2.3zm7-13h2.67A2.31 2.31 0 0 1 22 4v7a2.31 2.31 0 0 1-2.33 2H17"></path></svg>"#,
            Self::Copy => r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><rect x="9" y="9" width="13" height="13" rx="2" ry="2"></rect><path d="M5 15H4a2 2 0 0 1-2-2V4a2 2 0 0 1 2-2h9a2 2 0 0 1 2 2v1"></path></svg>"#,
            Self::Share => r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><circle cx="18" cy="5" r="3"></circle><circle cx="6" cy="12" r="3"></circle><circle cx="18" cy="19" r="3"></circle><line x1="8.59" y1="13.51" x2="15.42" y2="17.49"></line><line x1="15.41" y1="6.51" x2="8.59" y2="10.49"></line></svg>"#,
            Self::ExportPdf => r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M14 2H6a2 2 0 0 0-2 2v16a2 2 0 0 0 2 2h12a2 2 0 0 0 2-2V8z"></path><polyline points="14 2 14 8 20 8"></polyline><line x1="16" y1="13" x2="8" y2="13"></line><line x1="16" y1="17" x2="8" y2="17"></line></svg>"#,
            Self::ExportPptx => r#"<svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"><path d="M14 2H6a2 2 0 0 0-2 2v16a2 2 0 0 0 2 2h12a2 2 0 0 0 2-2V8z"></path><polyline points="14 2 14 8 20 8"></polyline><path d="M12 18v-6"></path><path d="M9 15l3 3 3-3"></path></svg>"#,
        }
    }

    /// Feedback only logs; copy hands the raw reply to the clipboard; share and
    /// the exports are stubs that alert.
    pub fn effect(self, reply: &str) -> ActionEffect {
        let (log, alert, clipboard) = match self {
            Self::ThumbsUp => ("User gave positive feedback.", None, None),
            Self::ThumbsDown => ("User gave negative feedback.", None, None),
            Self::Copy => ("Response copied to clipboard.", None, Some(reply.to_string())),
            Self::Share => ("Share link generated.", Some(format!("Share URL: {MOCK_SHARE_URL}")), None),
            Self::ExportPdf => ("Exported as PDF.", Some("Exporting as PDF...".to_string()), None),
            Self::ExportPptx => ("Exported as PPTX.", Some("Exporting as PPTX...".to_string()), None),
        };
        ActionEffect { log, alert, clipboard }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_carries_raw_reply() {
        let effect = ReplyAction::Copy.effect("**bold** answer");
        assert_eq!(effect.clipboard.as_deref(), Some("**bold** answer"));
        assert_eq!(effect.alert, None);
    }

    #[test]
    fn test_feedback_only_logs() {
        for action in [ReplyAction::ThumbsUp, ReplyAction::ThumbsDown] {
            let effect = action.effect("x");
            assert!(effect.alert.is_none() && effect.clipboard.is_none());
        }
    }

    #[test]
    fn test_stubs_alert() {
        assert_eq!(
            ReplyAction::Share.effect("x").alert.unwrap(),
            format!("Share URL: {MOCK_SHARE_URL}")
        );
        assert_eq!(ReplyAction::ExportPptx.effect("x").log, "Exported as PPTX.");
        assert!(ReplyAction::ALL.iter().all(|a| a.icon().starts_with("<svg")));
    }
}

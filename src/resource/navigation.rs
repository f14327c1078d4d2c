// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use clap::ValueEnum;
use inflector::Inflector as _;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::{
    api::{Api, Call, Transport},
    error::Result,
    session::display_opt,
    storage,
};

use super::Resource;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum NavigationType {
    Main,
    Footer,
    Cta,
}

impl NavigationType {
    pub(crate) const fn as_wire(self) -> &'static str {
        match self {
            Self::Main => "MAIN",
            Self::Footer => "FOOTER",
            Self::Cta => "CTA",
        }
    }
}

impl std::fmt::Display for NavigationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.to_possible_value().ok_or(std::fmt::Error)?;
        write!(f, "{}", value.get_name().to_title_case())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NavigationItem {
    #[tabled(rename = "ID")]
    pub(crate) id: i64,
    #[tabled(rename = "Order")]
    pub(crate) display_order: i32,
    #[tabled(rename = "Type")]
    pub(crate) navigation_type: NavigationType,
    #[tabled(rename = "Language")]
    pub(crate) language_code: String,
    #[tabled(rename = "Published")]
    pub(crate) is_published: bool,
    #[tabled(rename = "Text")]
    pub(crate) text: String,
    #[tabled(rename = "Link")]
    pub(crate) href: String,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Badge", display_with = "display_opt")]
    pub(crate) badge_text: Option<String>,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) icon_class: Option<String>,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) created_at: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Updated", display_with = "display_opt")]
    pub(crate) updated_at: Option<String>,
}

/// The writable part of a navigation entry. Identity and timestamps belong to
/// the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NavigationPayload {
    pub(crate) text: String,
    pub(crate) href: String,
    pub(crate) navigation_type: NavigationType,
    pub(crate) language_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) display_order: Option<i32>,
    pub(crate) is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) badge_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) icon_class: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NavigationFilters {
    pub(crate) navigation_type: Option<NavigationType>,
    pub(crate) language_code: Option<String>,
    pub(crate) is_published: Option<bool>,
}

pub(crate) struct Navigation;

impl Resource for Navigation {
    type Id = i64;
    type Item = NavigationItem;
    type Payload = NavigationPayload;
    type Filters = NavigationFilters;

    const PATH: &'static str = "/admin/navigation";
    const REORDER_SCOPE: &'static str = "type";

    fn apply_filters(filters: &Self::Filters, call: Call) -> Call {
        call.with_query_opt("type", filters.navigation_type.map(NavigationType::as_wire))
            .with_query_opt("lang", filters.language_code.as_ref())
            .with_query_opt("published", filters.is_published)
    }

    fn reorder_scope(filters: &Self::Filters) -> Option<String> {
        filters
            .navigation_type
            .map(|t| t.as_wire().to_owned())
    }
}

/// Reads the entries the public site renders for one menu, in display order.
/// Unpublished entries are dropped even if the backend hands them out.
pub(crate) async fn published<S: storage::Storage, T: Transport>(
    api: &Api<S, T>,
    navigation_type: NavigationType,
    language_code: &str,
) -> Result<Vec<NavigationItem>> {
    let items: Vec<NavigationItem> = api
        .fetch(
            Call::get("/navigation")
                .with_query("type", navigation_type.as_wire())
                .with_query("lang", language_code),
        )
        .await?;

    let mut items: Vec<_> = items
        .into_iter()
        .filter(|item| item.is_published && item.navigation_type == navigation_type)
        .collect();
    items.sort_by_key(|item| item.display_order);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::lock::Mutex;
    use serde_json::json;
    use serde_test::{assert_ser_tokens, Token};

    use super::*;
    use crate::{
        api::mock::{self, Mock},
        storage::Memory,
    };

    #[tokio::test]
    async fn public_reads_hide_unpublished_entries() -> Result<()> {
        let mock = Mock::new(|_| {
            mock::ok(json!([
                {"id": 1, "displayOrder": 2, "navigationType": "MAIN", "languageCode": "ko",
                 "isPublished": true, "text": "Contact", "href": "/contact"},
                {"id": 2, "displayOrder": 0, "navigationType": "MAIN", "languageCode": "ko",
                 "isPublished": false, "text": "Draft", "href": "/draft"},
                {"id": 3, "displayOrder": 1, "navigationType": "MAIN", "languageCode": "ko",
                 "isPublished": true, "text": "Products", "href": "/products",
                 "badgeText": "NEW"},
                {"id": 4, "displayOrder": 0, "navigationType": "FOOTER", "languageCode": "ko",
                 "isPublished": true, "text": "Privacy", "href": "/privacy"},
            ]))
        });
        let api = Api::new(mock.clone(), Arc::new(Mutex::new(Memory::new())));

        let items = published(&api, NavigationType::Main, "ko").await?;
        assert_eq!(
            items.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![3, 1]
        );
        assert_eq!(items[0].badge_text.as_deref(), Some("NEW"));

        let call = &mock.calls()[0];
        assert_eq!(call.path, "/navigation");
        assert_eq!(call.query("type"), Some("MAIN"));
        assert_eq!(call.query("lang"), Some("ko"));
        Ok(())
    }

    #[test]
    fn filters_become_query_parameters() {
        let filters = NavigationFilters {
            navigation_type: Some(NavigationType::Footer),
            language_code: None,
            is_published: Some(false),
        };
        assert_eq!(
            Navigation::reorder_scope(&filters).as_deref(),
            Some("FOOTER")
        );
        assert_eq!(Navigation::reorder_scope(&NavigationFilters::default()), None);
        assert_eq!(NavigationType::Cta.to_string(), "Cta");
    }

    #[test]
    fn payload_omits_unset_fields() {
        let payload = NavigationPayload {
            text: "Support".to_owned(),
            href: "/support".to_owned(),
            navigation_type: NavigationType::Cta,
            language_code: "en".to_owned(),
            display_order: None,
            is_published: false,
            description: None,
            badge_text: Some("24/7".to_owned()),
            icon_class: None,
        };

        assert_ser_tokens(
            &payload,
            &[
                Token::Struct {
                    name: "NavigationPayload",
                    len: 6,
                },
                Token::Str("text"),
                Token::Str("Support"),
                Token::Str("href"),
                Token::Str("/support"),
                Token::Str("navigationType"),
                Token::UnitVariant {
                    name: "NavigationType",
                    variant: "CTA",
                },
                Token::Str("languageCode"),
                Token::Str("en"),
                Token::Str("isPublished"),
                Token::Bool(false),
                Token::Str("badgeText"),
                Token::Some,
                Token::Str("24/7"),
                Token::StructEnd,
            ],
        );
    }
}

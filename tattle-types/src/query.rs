//! Metadata queries and the request/response shapes around them.

use serde::{Deserialize, Serialize};

/// One facet of topic metadata a client can request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaFacet {
    /// The topic description.
    Desc,
    /// Subscription state, optionally restricted to one user.
    Sub {
        /// Restrict the query to this user's subscription.
        user: Option<String>,
    },
    /// The account's tag set.
    Tags,
}

/// A metadata fetch, selecting one or more facets.
///
/// Built with [`MetaQuery::builder`]; duplicate facets collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaQuery {
    facets: Vec<MetaFacet>,
}

impl MetaQuery {
    /// Start building a query.
    pub fn builder() -> MetaQueryBuilder {
        MetaQueryBuilder::default()
    }

    /// The selected facets, in insertion order.
    pub fn facets(&self) -> &[MetaFacet] {
        &self.facets
    }

    /// Whether the description facet is selected.
    pub fn wants_desc(&self) -> bool {
        self.facets.contains(&MetaFacet::Desc)
    }

    /// Whether the tags facet is selected.
    pub fn wants_tags(&self) -> bool {
        self.facets.contains(&MetaFacet::Tags)
    }

    /// The user restriction of the subscription facet, if selected.
    /// Returns `Some(None)` for an unrestricted subscription query.
    pub fn sub_user(&self) -> Option<Option<&str>> {
        self.facets.iter().find_map(|f| match f {
            MetaFacet::Sub { user } => Some(user.as_deref()),
            _ => None,
        })
    }
}

/// Builder for [`MetaQuery`].
#[derive(Debug, Clone, Default)]
pub struct MetaQueryBuilder {
    facets: Vec<MetaFacet>,
}

impl MetaQueryBuilder {
    /// Select the description facet.
    pub fn with_desc(mut self) -> Self {
        self.push(MetaFacet::Desc);
        self
    }

    /// Select the subscription facet, optionally for one user.
    pub fn with_sub(mut self, user: Option<&str>) -> Self {
        self.push(MetaFacet::Sub {
            user: user.map(str::to_string),
        });
        self
    }

    /// Select the tags facet.
    pub fn with_tags(mut self) -> Self {
        self.push(MetaFacet::Tags);
        self
    }

    /// Finish the query.
    pub fn build(self) -> MetaQuery {
        MetaQuery {
            facets: self.facets,
        }
    }

    fn push(&mut self, facet: MetaFacet) {
        if !self.facets.contains(&facet) {
            self.facets.push(facet);
        }
    }
}

/// A subscription change sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    /// The user the change applies to; `None` means the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// The requested access mode, in string form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// The server's control response to an outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    /// HTTP-style status code.
    pub code: u16,
    /// Human-readable status text.
    pub text: String,
}

impl ServerResponse {
    /// A 200 "ok" response.
    pub fn ok() -> Self {
        Self {
            code: 200,
            text: "ok".into(),
        }
    }

    /// A 304 "not modified" response, used when a request resolved to a
    /// local no-op without reaching the server.
    pub fn not_modified() -> Self {
        Self {
            code: 304,
            text: "not modified".into(),
        }
    }

    /// Whether the code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

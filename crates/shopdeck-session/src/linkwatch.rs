//! Same-origin link enrichment.
//!
//! Links inserted into the page lose the embed's session parameters unless
//! something copies them over; a destination reached without `shop`/`host`
//! lands the merchant on the bare (unembedded) console. The observer copies
//! the parameters into every newly inserted same-origin link that lacks
//! them, exactly once per element.

use tracing::trace;
use url::Url;

use shopdeck_types::SessionParams;

use crate::document::{Document, NodeId, SubtreeObserver};

pub struct LinkObserver {
    location: Url,
    shop: Option<String>,
    host: Option<String>,
}

impl LinkObserver {
    pub fn new(location: Url, params: &SessionParams) -> Self {
        Self {
            location,
            shop: params.shop.clone(),
            host: params.host.clone(),
        }
    }

    fn enrich_link(&self, doc: &mut Document, id: NodeId) {
        if doc.is_enriched(id) {
            return;
        }
        let Some(href) = doc.attr(id, "href").map(str::to_string) else {
            return;
        };
        let Ok(mut dest) = self.location.join(&href) else {
            return;
        };
        if dest.origin() != self.location.origin() {
            return;
        }

        let present: Vec<String> = dest.query_pairs().map(|(k, _)| k.into_owned()).collect();
        {
            let mut pairs = dest.query_pairs_mut();
            if let Some(shop) = &self.shop {
                if !present.iter().any(|k| k == "shop") {
                    pairs.append_pair("shop", shop);
                }
            }
            if let Some(host) = &self.host {
                if !present.iter().any(|k| k == "host") {
                    pairs.append_pair("host", host);
                }
            }
        }

        trace!(href = %href, enriched = %dest, "carried session parameters into link");
        doc.set_attr(id, "href", dest.as_str());
        doc.mark_enriched(id);
    }
}

impl SubtreeObserver for LinkObserver {
    fn subtree_inserted(&self, doc: &mut Document, root: NodeId) {
        // Whole subtree, not just direct children.
        for id in doc.descendants(root) {
            if doc.tag(id) == "a" {
                self.enrich_link(doc, id);
            }
        }
    }
}

use {
    crate::domain::{
        Account,
        bidder::{BidderRequest, Catalog, Invoker, Name},
        openrtb::{BidRequest, Imp},
    },
    serde_json::json,
    std::{collections::HashMap, sync::Arc},
};

/// A bidder taking part in the auction.
#[derive(Clone)]
pub struct Participant {
    pub request: BidderRequest,
    pub invoker: Arc<dyn Invoker>,
    pub cookie_family: String,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("request", &self.request)
            .field("cookie_family", &self.cookie_family)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct Selection {
    /// In the order the bidders first appear in the request's impressions.
    pub participants: Vec<Participant>,
    pub warnings: Vec<String>,
}

/// Splits the request into one request per bidder it names.
///
/// Bidders are named per impression under `imp.ext.prebid.bidder`. A name may
/// be an alias of a configured bidder. Each bidder only gets the impressions
/// that name it, with its parameters moved to `imp.ext.bidder`.
pub fn select(
    request: &BidRequest,
    aliases: &HashMap<String, String>,
    catalog: &Catalog,
    account: &Account,
) -> Selection {
    let mut names = Vec::<String>::new();
    for imp in &request.imp {
        for name in imp.bidders().keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }

    let mut selection = Selection::default();
    for name in names {
        let core = Name::from(aliases.get(&name).unwrap_or(&name).as_str());
        let Some(entry) = catalog.entry(&core) else {
            selection
                .warnings
                .push(format!("bidder {name} is not configured"));
            continue;
        };
        if !entry.enabled {
            selection.warnings.push(format!("bidder {name} is disabled"));
            continue;
        }
        let name = Name::from(name);
        if account.disabled_bidders.contains(&core) || account.disabled_bidders.contains(&name) {
            selection.warnings.push(format!(
                "bidder {name} is disabled for account {}",
                account.id
            ));
            continue;
        }

        let imp = request
            .imp
            .iter()
            .filter_map(|imp| bidder_imp(imp, &name))
            .collect();
        selection.participants.push(Participant {
            request: BidderRequest {
                bidder: name,
                request: BidRequest {
                    imp,
                    ..request.clone()
                },
            },
            invoker: entry.invoker.clone(),
            cookie_family: entry.cookie_family.clone(),
        });
    }
    selection
}

fn bidder_imp(imp: &Imp, bidder: &Name) -> Option<Imp> {
    let params = imp.bidders().remove(bidder.as_str())?;
    Some(Imp {
        ext: Some(json!({ "bidder": params })),
        ..imp.clone()
    })
}

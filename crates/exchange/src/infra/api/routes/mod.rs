mod auction;
mod healthz;

pub(super) use {auction::auction, healthz::healthz};

//! Player feature row

use crate::features::preprocess::{ClutchRecord, PlayerIndividual, PlayerOverview};
use crate::features::FeatureRow;

/// Everything known about a player under one Config
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerStats {
    pub overview: PlayerOverview,
    pub individual: PlayerIndividual,
    pub clutches: ClutchRecord,
}

impl PlayerStats {
    pub fn features(&self) -> FeatureRow {
        let o = &self.overview;
        let mut row = FeatureRow::new();
        row.set("rating", o.rating);
        row.set("dpr", o.dpr);
        row.set("kast", o.kast);
        row.set("impact", o.impact);
        row.set("adr", o.adr);
        row.set("kpr", o.kpr);
        row.set("total_kills", o.total_kills);
        row.set("headshots", o.headshots);
        row.set("kd", o.kd);
        row.set("grenade_dmg", o.grenade_dmg);
        row.set("maps_played", o.maps_played);
        row.set("avg_rounds_played", o.avg_rounds_played());
        row.set("apr", o.apr);
        row.set("opening_ratio", self.individual.opening_ratio);
        row.set("opening_rating", self.individual.opening_rating);
        row.set("is_awp", self.individual.is_awp());
        row.set("clutch_1v1_winrate", self.clutches.winrate());
        row
    }
}

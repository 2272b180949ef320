//! Attack and monster definitions, the player's roster, and sheet sizes.
//!
//! The built-in catalog is embedded JSON. Attacks are shared through `Rc`
//! so every monster listing one points at the same immutable definition.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::ecs::{
    Attack, Combatant, Entity, FrameGrid, Side, Sprite, SpriteImage, Vec2,
};

const BUILTIN_CATALOG: &str = include_str!("../../assets/catalog.json");

/// Sheet key of the projectile sprite.
pub const FIREBALL_SHEET: &str = "fireball";
/// Frame grid of the projectile sheet.
pub const FIREBALL_FRAMES: FrameGrid = FrameGrid::new(4, 10);
/// Sheet key of the battle backdrop.
pub const BACKGROUND_SHEET: &str = "battle_background";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("attack {0:?} is defined twice")]
    DuplicateAttack(String),

    #[error("monster {0:?} is defined twice")]
    DuplicateMonster(String),

    #[error("monster {monster:?} lists unknown attack {attack:?}")]
    UnknownAttack { monster: String, attack: String },

    #[error("unknown monster {0:?}")]
    UnknownMonster(String),
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CatalogFile {
    attacks: Vec<Attack>,
    monsters: Vec<MonsterDef>,
    wild: String,
    starting_roster: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MonsterDef {
    name: String,
    sheet: String,
    frames: FrameGrid,
    attacks: Vec<String>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A monster species: what every instance of it starts out as.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterTemplate {
    pub name: String,
    pub sheet: String,
    pub frames: FrameGrid,
    pub attacks: Vec<Rc<Attack>>,
}

impl MonsterTemplate {
    /// Instantiate a fresh, full-health monster at `position`.
    pub fn spawn(&self, side: Side, position: Vec2, max_health: i32, sizes: &SheetSizes) -> Entity {
        let sprite = Sprite::new(
            position,
            SpriteImage::new(self.sheet.clone(), sizes.get(&self.sheet)),
            self.frames,
        )
        .animated();
        Entity::monster(
            self.name.clone(),
            sprite,
            Combatant::new(side, max_health, self.attacks.clone()),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    attacks: FxHashMap<String, Rc<Attack>>,
    monsters: FxHashMap<String, Rc<MonsterTemplate>>,
    wild: String,
    starting_roster: Vec<String>,
}

impl Catalog {
    /// The catalog shipped with the game.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(src: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(src)?;

        let mut attacks = FxHashMap::default();
        for attack in file.attacks {
            let name = attack.name.clone();
            if attacks.insert(name.clone(), Rc::new(attack)).is_some() {
                return Err(CatalogError::DuplicateAttack(name));
            }
        }

        let mut monsters = FxHashMap::default();
        for def in file.monsters {
            let known = def
                .attacks
                .iter()
                .map(|name| {
                    attacks
                        .get(name)
                        .cloned()
                        .ok_or_else(|| CatalogError::UnknownAttack {
                            monster: def.name.clone(),
                            attack: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let template = MonsterTemplate {
                name: def.name.clone(),
                sheet: def.sheet,
                frames: def.frames,
                attacks: known,
            };
            if monsters.insert(def.name.clone(), Rc::new(template)).is_some() {
                return Err(CatalogError::DuplicateMonster(def.name));
            }
        }

        for name in file.starting_roster.iter().chain([&file.wild]) {
            if !monsters.contains_key(name) {
                return Err(CatalogError::UnknownMonster(name.clone()));
            }
        }

        Ok(Self {
            attacks,
            monsters,
            wild: file.wild,
            starting_roster: file.starting_roster,
        })
    }

    pub fn monster(&self, name: &str) -> Option<&Rc<MonsterTemplate>> {
        self.monsters.get(name)
    }

    pub fn monsters(&self) -> impl Iterator<Item = &Rc<MonsterTemplate>> {
        self.monsters.values()
    }

    /// Name of the monster met in the wild.
    pub fn wild(&self) -> &str {
        &self.wild
    }

    pub fn starting_roster(&self) -> Roster {
        Roster::new(self.starting_roster.clone())
    }

    /// Every sheet key a battle may draw.
    pub fn sheets(&self) -> Vec<String> {
        let mut sheets: Vec<String> = self.monsters.values().map(|m| m.sheet.clone()).collect();
        sheets.sort();
        sheets.push(FIREBALL_SHEET.to_owned());
        sheets.push(BACKGROUND_SHEET.to_owned());
        sheets
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Monsters the player may send into battle, in the order they were won.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Append `name` unless already present. Returns whether it was added.
    pub fn add(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_owned());
        true
    }
}

// ---------------------------------------------------------------------------
// Sheet sizes
// ---------------------------------------------------------------------------

/// Pixel sizes of loaded sprite sheets, keyed by sheet name.
#[derive(Debug, Clone, Default)]
pub struct SheetSizes {
    sizes: FxHashMap<String, Vec2>,
}

impl SheetSizes {
    pub fn insert(&mut self, key: impl Into<String>, size: Vec2) {
        self.sizes.insert(key.into(), size);
    }

    pub fn get(&self, key: &str) -> Option<Vec2> {
        self.sizes.get(key).copied()
    }

    /// Keys from `required` that have no size yet.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|key| !self.sizes.contains_key(key.as_str()))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::AttackKind;

    // -- builtin ------------------------------------------------------------

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().expect("builtin catalog is valid");
        let emby = catalog.monster("Emby").expect("Emby exists");
        let kinds: Vec<AttackKind> = emby.attacks.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, [AttackKind::Melee, AttackKind::Projectile]);
        assert!(catalog.monster(catalog.wild()).is_some());
        assert!(!catalog.starting_roster().contains(catalog.wild()));
    }

    #[test]
    fn monsters_share_attack_definitions() {
        let catalog = Catalog::builtin().expect("valid");
        let emby = catalog.monster("Emby").expect("Emby exists");
        let draggle = catalog.monster("Draggle").expect("Draggle exists");
        assert!(Rc::ptr_eq(&emby.attacks[0], &draggle.attacks[0]));
    }

    #[test]
    fn sheets_include_projectile_and_background() {
        let sheets = Catalog::builtin().expect("valid").sheets();
        assert!(sheets.iter().any(|s| s == FIREBALL_SHEET));
        assert!(sheets.iter().any(|s| s == BACKGROUND_SHEET));
        assert!(sheets.iter().any(|s| s == "emby"));
    }

    // -- validation ---------------------------------------------------------

    #[test]
    fn unknown_attack_reference_is_rejected() {
        let src = r#"{
            "attacks": [],
            "monsters": [{"name":"M","sheet":"m","frames":{"max":1,"hold":10},"attacks":["Zap"]}],
            "wild": "M",
            "starting_roster": []
        }"#;
        match Catalog::from_json(src) {
            Err(CatalogError::UnknownAttack { monster, attack }) => {
                assert_eq!(monster, "M");
                assert_eq!(attack, "Zap");
            }
            other => panic!("expected UnknownAttack, got {other:?}"),
        }
    }

    #[test]
    fn unknown_wild_monster_is_rejected() {
        let src = r#"{"attacks": [], "monsters": [], "wild": "Ghost", "starting_roster": []}"#;
        assert!(matches!(
            Catalog::from_json(src),
            Err(CatalogError::UnknownMonster(name)) if name == "Ghost"
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Catalog::from_json("{"),
            Err(CatalogError::Parse(_))
        ));
    }

    // -- roster -------------------------------------------------------------

    #[test]
    fn roster_add_is_idempotent() {
        let mut roster = Roster::new(vec!["Emby".into()]);
        assert!(roster.add("JabbaScript"));
        assert!(!roster.add("JabbaScript"));
        assert!(!roster.add("Emby"));
        assert_eq!(roster.names(), ["Emby", "JabbaScript"]);
    }

    // -- spawning -----------------------------------------------------------

    #[test]
    fn spawn_starts_at_full_health_with_known_size() {
        let catalog = Catalog::builtin().expect("valid");
        let mut sizes = SheetSizes::default();
        sizes.insert("emby", Vec2::new(256.0, 64.0));

        let entity = catalog.monster("Emby").expect("exists").spawn(
            Side::Player,
            Vec2::new(1.0, 2.0),
            100,
            &sizes,
        );
        let combatant = entity.combatant.expect("monsters fight");
        assert_eq!(combatant.health, 100);
        assert_eq!(combatant.side, Side::Player);
        assert!(entity.sprite.animate);
        assert_eq!(entity.sprite.image.size, Some(Vec2::new(256.0, 64.0)));
        assert_eq!(sizes.missing(&["emby".into(), "draggle".into()]), vec!["draggle"]);
    }
}

use chrono::{DateTime, Utc};
use murajaa_core::{
    store::RecordStore, CardId, CoreError, ItemId, Learner, LearnerId, ReviewCard, ReviewEvent,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;

pub mod paths;

const FILE_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    learners: Vec<Learner>,
    cards: Vec<ReviewCard>,
    events: Vec<ReviewEvent>,
}

#[derive(Default, Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    learners: HashMap<LearnerId, Learner>,
    cards: HashMap<CardId, ReviewCard>,
    events: HashMap<CardId, Vec<ReviewEvent>>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            learners: HashMap::new(),
            cards: HashMap::new(),
            events: HashMap::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            learners: self.learners.values().cloned().collect(),
            cards: self.cards.values().cloned().collect(),
            events: self
                .events
                .values()
                .flat_map(|v| v.clone().into_iter())
                .collect(),
        }
    }

    fn from_image(img: FileImage) -> Self {
        let mut learners = HashMap::new();
        for l in img.learners {
            learners.insert(l.id, l);
        }
        let mut cards = HashMap::new();
        for c in img.cards {
            cards.insert(c.id, c);
        }
        let mut events: HashMap<CardId, Vec<ReviewEvent>> = HashMap::new();
        for e in img.events {
            events.entry(e.card_id).or_default().push(e);
        }
        Self {
            created_at: img.created_at,
            updated_at: img.updated_at,
            learners,
            cards,
            events,
        }
    }
}

pub struct JsonStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
}

impl JsonStore {
    pub async fn open_default() -> Result<Self, CoreError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, 10).await
    }

    pub async fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, CoreError> {
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let state = load_or_init(&path).await?;
        Ok(Self {
            path,
            backups_dir,
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
        })
    }

    async fn save(&self) -> Result<(), CoreError> {
        let snapshot = {
            let mut s = self.state.write();
            s.updated_at = Utc::now();
            s.to_image()
        };
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;

        // Join error -> CoreError, inner io::Error -> CoreError
        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &snapshot))
            .await
            .map_err(|_| CoreError::Storage("io"))?
            .map_err(|_| CoreError::Storage("io"))?;
        Ok(())
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(|_| CoreError::Storage("io"))
}

async fn load_or_init(path: &Path) -> Result<State, CoreError> {
    if path.exists() {
        let p = path.to_path_buf();
        let img: FileImage = task::spawn_blocking(move || {
            let mut f = fs::File::open(&p)?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            let v = serde_json::from_str::<FileImage>(&buf)?;
            Ok::<FileImage, std::io::Error>(v)
        })
        .await
        .map_err(|_| CoreError::Storage("io"))
        .and_then(|r| r.map_err(|_| CoreError::Storage("io")))?;
        let mut st = State::from_image(img);
        st.updated_at = Utc::now();
        Ok(st)
    } else {
        let st = State::new_empty();
        let img = st.to_image();
        write_with_backup(path, &path.with_extension("backups"), 1, &img)
            .map_err(|_| CoreError::Storage("io"))?;
        Ok(st)
    }
}

fn write_with_backup(
    path: &Path,
    backups_dir: &Path,
    max_backups: usize,
    img: &FileImage,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(backups_dir)?;

    let json = serde_json::to_vec_pretty(img).expect("serialize");
    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    let _ = fs::remove_file(path);
    tmp.persist(path)?;

    // Backup rotation
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let backup_name = format!("murajaa-{ts}.json");
    let backup_path = backups_dir.join(backup_name);
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(&json)?;
    btmp.flush()?;
    let _ = fs::remove_file(&backup_path);
    btmp.persist(&backup_path)?;

    rotate_backups(backups_dir, max_backups)?;

    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    entries.sort_by_key(|e| e.metadata().and_then(|m| m.modified()).ok());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(e.path());
        }
    }
    Ok(())
}

use async_trait::async_trait;

#[async_trait]
impl RecordStore for JsonStore {
    async fn create_learner(&self, name: &str) -> Result<Learner, CoreError> {
        let learner = Learner::new(name);
        {
            let mut s = self.state.write();
            if s.learners.values().any(|l| l.name.eq_ignore_ascii_case(name)) {
                return Err(CoreError::Conflict("learner name already exists"));
            }
            s.learners.insert(learner.id, learner.clone());
        }
        self.save().await?;
        Ok(learner)
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Learner, CoreError> {
        let s = self.state.read();
        s.learners
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("learner"))
    }

    async fn list_learners(&self) -> Result<Vec<Learner>, CoreError> {
        let s = self.state.read();
        Ok(s.learners.values().cloned().collect())
    }

    async fn delete_learner(&self, id: LearnerId) -> Result<(), CoreError> {
        {
            let mut s = self.state.write();
            if s.learners.remove(&id).is_none() {
                return Err(CoreError::NotFound("learner"));
            }
            let to_remove: Vec<CardId> = s
                .cards
                .values()
                .filter(|c| c.learner_id == id)
                .map(|c| c.id)
                .collect();
            for cid in to_remove {
                s.cards.remove(&cid);
                s.events.remove(&cid);
            }
        }
        self.save().await
    }

    async fn add_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        front: &str,
        back: &str,
        transliteration: Option<&str>,
        tags: &[String],
    ) -> Result<ReviewCard, CoreError> {
        let card = {
            let s = self.state.read();
            if !s.learners.contains_key(&learner_id) {
                return Err(CoreError::NotFound("learner"));
            }
            if s.cards
                .values()
                .any(|c| c.learner_id == learner_id && c.item_id == item_id)
            {
                return Err(CoreError::Conflict("card exists for learner and item"));
            }
            let mut c = ReviewCard::new(learner_id, item_id, front, back);
            c.transliteration = transliteration.map(|s| s.to_string());
            c.tags = tags.to_vec();
            c
        };
        {
            let mut s = self.state.write();
            s.cards.insert(card.id, card.clone());
        }
        self.save().await?;
        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<ReviewCard, CoreError> {
        let s = self.state.read();
        s.cards.get(&id).cloned().ok_or(CoreError::NotFound("card"))
    }

    async fn find_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<ReviewCard, CoreError> {
        let s = self.state.read();
        s.cards
            .values()
            .find(|c| c.learner_id == learner_id && c.item_id == item_id)
            .cloned()
            .ok_or(CoreError::NotFound("card"))
    }

    async fn list_cards(&self, learner_id: Option<LearnerId>) -> Result<Vec<ReviewCard>, CoreError> {
        let s = self.state.read();
        let mut v: Vec<ReviewCard> = s.cards.values().cloned().collect();
        if let Some(lid) = learner_id {
            v.retain(|c| c.learner_id == lid);
        }
        Ok(v)
    }

    async fn due_cards(
        &self,
        learner_id: LearnerId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ReviewCard>, CoreError> {
        let cards = self.list_cards(Some(learner_id)).await?;
        Ok(murajaa_core::filters::due_cards(&cards, as_of))
    }

    async fn save_card(&self, card: &ReviewCard) -> Result<ReviewCard, CoreError> {
        {
            let mut s = self.state.write();
            if !s.cards.contains_key(&card.id) {
                return Err(CoreError::NotFound("card"));
            }
            s.cards.insert(card.id, card.clone());
        }
        self.save().await?;
        Ok(card.clone())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        {
            let mut s = self.state.write();
            if s.cards.remove(&id).is_none() {
                return Err(CoreError::NotFound("card"));
            }
            s.events.remove(&id);
        }
        self.save().await
    }

    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError> {
        {
            let mut s = self.state.write();
            let Some(c) = s.cards.get_mut(&id) else {
                return Err(CoreError::NotFound("card"));
            };
            c.suspended = suspended;
        }
        self.save().await
    }

    async fn insert_event(&self, event: &ReviewEvent) -> Result<(), CoreError> {
        {
            let mut s = self.state.write();
            s.events.entry(event.card_id).or_default().push(event.clone());
        }
        self.save().await
    }

    async fn list_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewEvent>, CoreError> {
        let s = self.state.read();
        Ok(s.events.get(&card_id).cloned().unwrap_or_default())
    }

    async fn list_events(
        &self,
        learner_id: Option<LearnerId>,
    ) -> Result<Vec<ReviewEvent>, CoreError> {
        let s = self.state.read();
        match learner_id {
            None => Ok(s.events.values().flatten().cloned().collect()),
            Some(lid) => Ok(s
                .events
                .iter()
                .filter(|(cid, _)| {
                    s.cards.get(*cid).map(|c| c.learner_id == lid).unwrap_or(false)
                })
                .flat_map(|(_, v)| v.clone())
                .collect()),
        }
    }
}

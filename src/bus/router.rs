//! `Router` (§4.6A, §9 open question resolution, option (a)): fans an
//! `outbox/` message out to every matching recipient's `inbox/`, then
//! removes it from the sender's `outbox/`. Without this, `MessageBus`
//! degenerates to a per-instance journal (§4.6).

use std::fs;
use std::path::Path;

use super::{BusError, Recipient};

pub struct Router;

impl Router {
    /// One fan-out tick over every instance directory under
    /// `messages_root`. `live_instance_ids` is the current
    /// `SessionOrchestrator.list()` output, used to expand `broadcast` to
    /// "every live instance except the sender".
    pub fn tick(messages_root: &Path, live_instance_ids: &[String]) -> Result<usize, BusError> {
        let mut delivered = 0;

        let Ok(instance_dirs) = fs::read_dir(messages_root) else {
            return Ok(0);
        };

        for entry in instance_dirs.filter_map(|e| e.ok()) {
            let sender_id = entry.file_name().to_string_lossy().into_owned();
            let outbox = entry.path().join("outbox");
            let Ok(files) = fs::read_dir(&outbox) else {
                continue;
            };

            for file in files.filter_map(|e| e.ok()).map(|e| e.path()) {
                if file.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let bytes = fs::read(&file)?;
                let message: super::Message = serde_json::from_slice(&bytes)?;
                let recipients = Self::expand(&message.to(), &sender_id, live_instance_ids);

                for recipient in &recipients {
                    let inbox = messages_root.join(recipient).join("inbox");
                    fs::create_dir_all(&inbox)?;
                    let dest = inbox.join(file.file_name().expect("outbox entries have a filename"));
                    if dest.exists() {
                        continue;
                    }
                    let tmp = inbox.join(format!(".{}.tmp", file.file_name().unwrap().to_string_lossy()));
                    fs::write(&tmp, &bytes)?;
                    fs::rename(&tmp, &dest)?;
                    delivered += 1;
                }

                // The source file leaves outbox atomically once fanned out to
                // every recipient — this is the "move" half of the delivery
                // unit even though each recipient gets an independently named
                // copy, keeping the three-directory invariant (§8 property 3)
                // intact at the unit-of-delivery level.
                fs::remove_file(&file)?;
            }
        }

        Ok(delivered)
    }

    fn expand(to: &Recipient, sender_id: &str, live_instance_ids: &[String]) -> Vec<String> {
        match to {
            Recipient::Broadcast => live_instance_ids
                .iter()
                .filter(|id| id.as_str() != sender_id)
                .cloned()
                .collect(),
            Recipient::Instances(ids) => ids.clone(),
        }
    }
}

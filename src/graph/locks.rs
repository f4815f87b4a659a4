use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use futures::lock::{Mutex, OwnedMutexGuard};

/// One async mutex per entity id, so mutations of the same node or edge
/// run one after another while unrelated ids proceed freely. Entries are
/// dropped once nobody holds or waits on them.
#[derive(Default)]
pub struct EntityLocks {
	locks: RefCell<HashMap<String, Arc<Mutex<()>>>>,
}

pub struct EntityGuard<'a> {
	owner: &'a EntityLocks,
	id: String,
	guard: Option<OwnedMutexGuard<()>>,
}

impl EntityLocks {
	pub async fn lock(&self, id: &str) -> EntityGuard<'_> {
		let mutex = self
			.locks
			.borrow_mut()
			.entry(id.to_owned())
			.or_default()
			.clone();
		let guard = mutex.lock_owned().await;
		EntityGuard {
			owner: self,
			id: id.to_owned(),
			guard: Some(guard),
		}
	}

	fn prune(&self, id: &str) {
		let mut locks = self.locks.borrow_mut();
		if locks.get(id).is_some_and(|m| Arc::strong_count(m) == 1) {
			locks.remove(id);
		}
	}
}

impl Drop for EntityGuard<'_> {
	fn drop(&mut self) {
		self.guard.take();
		self.owner.prune(&self.id);
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use futures::{FutureExt, pin_mut, poll};

	use super::*;

	impl EntityLocks {
		fn len(&self) -> usize {
			self.locks.borrow().len()
		}
	}

	#[test]
	fn same_id_waits_other_ids_do_not() {
		let locks = EntityLocks::default();
		block_on(async {
			let first = locks.lock("a").await;

			let same = locks.lock("a").fuse();
			pin_mut!(same);
			assert!(poll!(&mut same).is_pending());

			let other = locks.lock("b").await;
			drop(other);

			drop(first);
			let again = same.await;
			drop(again);
		});
		assert_eq!(locks.len(), 0);
	}
}

use std::{
    ops::{Deref, DerefMut},
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc::{self, Receiver, SyncSender},
    },
};

use log::{debug, trace};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("pool is closed")]
pub struct PoolClosed;

/// Fixed set of items shared by concurrent callers.
///
/// Items sit in a bounded channel; [`Pool::acquire`] blocks until one is free and
/// the returned guard puts it back when dropped.
#[derive(Debug)]
pub struct Pool<T> {
    capacity: usize,
    sender: Mutex<Option<SyncSender<T>>>,
    receiver: Mutex<Receiver<T>>,
    closed: AtomicBool,
    in_use: AtomicUsize,
}

impl<T> Pool<T> {
    pub fn new(items: Vec<T>) -> Self {
        assert!(!items.is_empty());

        let capacity = items.len();
        let (sender, receiver) = mpsc::sync_channel(capacity);
        for item in items {
            // cannot fail, the channel holds exactly `capacity` items
            let _ = sender.try_send(item);
        }

        Self {
            capacity,
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
            closed: AtomicBool::new(false),
            in_use: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently checked out.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Takes an item out of the pool, blocking while all of them are in use.
    pub fn acquire(&self) -> Result<Pooled<'_, T>, PoolClosed> {
        if self.is_closed() {
            return Err(PoolClosed);
        }

        let item = lock(&self.receiver).recv().map_err(|_| PoolClosed)?;
        let in_use = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("acquired pooled item ({in_use}/{})", self.capacity);

        Ok(Pooled {
            pool: self,
            item: Some(item),
        })
    }

    /// Closes the pool and hands back every item, waiting for outstanding guards
    /// to be dropped. Must not be called while holding a guard of this pool.
    ///
    /// Returns an empty list if the pool was already closed.
    pub fn close(&self) -> Vec<T> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Vec::new();
        }

        let mut items = Vec::with_capacity(self.capacity);
        {
            let receiver = lock(&self.receiver);
            while items.len() < self.capacity {
                match receiver.recv() {
                    Ok(item) => items.push(item),
                    Err(_) => break,
                }
            }
        }
        drop(lock(&self.sender).take());

        debug!("closed pool, reclaimed {} items", items.len());
        items
    }

    fn release(&self, item: T) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        if let Some(sender) = lock(&self.sender).as_ref() {
            let _ = sender.try_send(item);
        }
    }
}

fn lock<M>(mutex: &Mutex<M>) -> MutexGuard<'_, M> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Item checked out of a [`Pool`]; returned to it on drop.
#[derive(Debug)]
pub struct Pooled<'a, T> {
    pool: &'a Pool<T>,
    item: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pooled item is present until drop")
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pooled item is present until drop")
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Barrier},
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn acquire_and_release() {
        let pool = Pool::new(vec![1, 2]);

        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert_eq!(pool.in_use(), 2);
        assert_eq!(*first + *second, 3);

        drop(first);
        assert_eq!(pool.in_use(), 1);
        let third = pool.acquire().unwrap();
        assert_eq!(*third, 1);
    }

    #[test]
    fn guard_allows_mutation() {
        let pool = Pool::new(vec![String::from("a")]);

        pool.acquire().unwrap().push('b');
        assert_eq!(*pool.acquire().unwrap(), "ab");
    }

    #[test]
    fn never_exceeds_capacity() {
        let pool = Pool::new(vec![(), ()]);
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..5 {
                        let _guard = pool.acquire().unwrap();
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(1));
                        current.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn close_waits_for_outstanding_items() {
        let pool = Arc::new(Pool::new(vec![1, 2, 3]));
        let barrier = Arc::new(Barrier::new(2));

        let worker = {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let _guard = pool.acquire().unwrap();
                barrier.wait();
                thread::sleep(Duration::from_millis(20));
            })
        };

        barrier.wait();
        let mut items = pool.close();
        worker.join().unwrap();

        items.sort();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn acquire_after_close() {
        let pool = Pool::new(vec![1]);

        assert_eq!(pool.close().len(), 1);
        assert!(pool.close().is_empty());
        assert_eq!(pool.acquire().unwrap_err(), PoolClosed);
    }

    #[test]
    fn blocked_acquire_fails_on_close() {
        let pool = Arc::new(Pool::new(vec![1]));
        let guard = pool.acquire().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire().map(|item| *item))
        };

        thread::sleep(Duration::from_millis(20));
        drop(guard);
        // the waiter either got the freed item before close or sees the pool closed
        let closer = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.close())
        };

        let waited = waiter.join().unwrap();
        let items = closer.join().unwrap();
        assert_eq!(items, vec![1]);
        assert!(waited == Ok(1) || waited == Err(PoolClosed));
    }
}

use tracing::{event, instrument, Level};

#[derive(Debug)]
pub struct TlsCounter {
    // mutex is used primarily from one thread, so it's not a bottleneck
    count: thread_local::ThreadLocal<std::sync::Mutex<u64>>,
}

impl TlsCounter {
    pub fn new() -> Self {
        Self {
            count: thread_local::ThreadLocal::new(),
        }
    }

    pub fn add(&self, value: u64) {
        let mutex = self.count.get_or(|| std::sync::Mutex::new(0));
        let mut guard = mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard += value;
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn get(&self) -> u64 {
        self.count.iter().fold(0, |x, y| {
            x + *y.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
        })
    }
}

impl Default for TlsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Started/finished pair for tasks dispatched to the worker pool.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    started: TlsCounter,
    finished: TlsCounter,
}

pub struct ProgressGuard<'a> {
    progress: &'a ProgressCounter,
}

impl<'a> ProgressGuard<'a> {
    pub fn new(progress: &'a ProgressCounter) -> Self {
        progress.started.inc();
        Self { progress }
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.progress.finished.inc();
    }
}

pub struct Status {
    pub started: u64,
    pub finished: u64,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> ProgressGuard<'_> {
        ProgressGuard::new(self)
    }

    #[instrument]
    pub fn get(&self) -> Status {
        let mut status = Status {
            started: self.started.get(),
            finished: self.finished.get(),
        };
        if status.finished > status.started {
            event!(
                Level::DEBUG,
                "Progress inversion - started: {}, finished {}",
                status.started,
                status.finished
            );
            status.started = status.finished;
        }
        status
    }
}

/// Live counters for a selection run, shared by all tasks.
#[derive(Debug)]
pub struct Progress {
    pub tasks: ProgressCounter,
    pub dirs_scanned: TlsCounter,
    pub files_scanned: TlsCounter,
    pub targets_checked: TlsCounter,
    pub files_matched: TlsCounter,
    pub files_copied: TlsCounter,
    pub bytes_copied: TlsCounter,
    pub copy_failures: TlsCounter,
    start_time: std::time::Instant,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            tasks: Default::default(),
            dirs_scanned: Default::default(),
            files_scanned: Default::default(),
            targets_checked: Default::default(),
            files_matched: Default::default(),
            files_copied: Default::default(),
            bytes_copied: Default::default(),
            copy_failures: Default::default(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn get_duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ProgressPrinter<'a> {
    progress: &'a Progress,
    last_copied: u64,
    last_bytes: u64,
    last_update: std::time::Instant,
}

impl<'a> ProgressPrinter<'a> {
    pub fn new(progress: &'a Progress) -> Self {
        Self {
            progress,
            last_copied: progress.files_copied.get(),
            last_bytes: progress.bytes_copied.get(),
            last_update: std::time::Instant::now(),
        }
    }

    pub fn print(&mut self) -> String {
        let time_now = std::time::Instant::now();
        let tasks = self.progress.tasks.get();
        let total_duration_secs = self.progress.get_duration().as_secs_f64().max(f64::EPSILON);
        let curr_duration_secs = (time_now - self.last_update).as_secs_f64().max(f64::EPSILON);
        let copied = self.progress.files_copied.get();
        let average_copy_rate = copied as f64 / total_duration_secs;
        let current_copy_rate = (copied - self.last_copied) as f64 / curr_duration_secs;
        let bytes = self.progress.bytes_copied.get();
        let average_bytes_rate = bytes as f64 / total_duration_secs;
        let current_bytes_rate = (bytes - self.last_bytes) as f64 / curr_duration_secs;
        self.last_copied = copied;
        self.last_bytes = bytes;
        self.last_update = time_now;
        format!(
            "---------------------\n\
            TASKS:\n\
            pending:  {:>10}\n\
            finished: {:>10}\n\
            -----------------------\n\
            SCANNED:\n\
            directories: {:>10}\n\
            files:       {:>10}\n\
            -----------------------\n\
            MATCHED:\n\
            targets checked: {:>10}\n\
            files matched:   {:>10}\n\
            -----------------------\n\
            COPIED:\n\
            average: {:>10.2} files/s {:>10}/s\n\
            current: {:>10.2} files/s {:>10}/s\n\
            files:   {:>10}\n\
            total:   {:>10}\n\
            failed:  {:>10}",
            tasks.started - tasks.finished,
            tasks.finished,
            self.progress.dirs_scanned.get(),
            self.progress.files_scanned.get(),
            self.progress.targets_checked.get(),
            self.progress.files_matched.get(),
            average_copy_rate,
            bytesize::ByteSize(average_bytes_rate as u64),
            current_copy_rate,
            bytesize::ByteSize(current_bytes_rate as u64),
            copied,
            bytesize::ByteSize(bytes),
            self.progress.copy_failures.get(),
        )
    }
}

/// Log a progress report every `delay` until cancelled.
pub async fn report_progress(
    progress: &Progress,
    delay: std::time::Duration,
    done: tokio_util::sync::CancellationToken,
) {
    let mut printer = ProgressPrinter::new(progress);
    loop {
        tokio::select! {
            _ = done.cancelled() => return,
            _ = tokio::time::sleep(delay) => {
                tracing::info!("progress:\n{}", printer.print());
            }
        }
    }
}

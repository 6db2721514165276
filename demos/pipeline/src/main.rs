use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, ensure};
use argh::FromArgs;
use syncq::ConcurrentQueue;

#[derive(Debug, FromArgs)]
/// Producer-consumer pipeline over a blocking queue
#[argh(help_triggers("--help"))]
struct Args {
    /// number of producer threads
    #[argh(option, default = "4")]
    producers: usize,
    /// number of consumer threads
    #[argh(option, default = "2")]
    consumers: usize,
    /// items pushed by each producer
    #[argh(option, default = "16")]
    items: usize,
    /// upper bound of the random delay between pushes, in microseconds
    #[argh(option, arg_name = "us", default = "500")]
    max_delay_us: u64,
}

#[derive(Debug)]
enum Message {
    Job { producer: usize, seq: usize },
    /// Tells one consumer to stop. Consumers have no other way out of
    /// `wait_and_pop`.
    Stop,
}

impl From<(usize, usize)> for Message {
    fn from((producer, seq): (usize, usize)) -> Self {
        Message::Job { producer, seq }
    }
}

#[derive(Debug, Default)]
struct Report {
    received: usize,
    checksum: u64,
}

pub fn main() -> Result<()> {
    let args = argh::from_env::<Args>();
    tracing_subscriber::fmt()
        .with_thread_names(true)
        .without_time()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    ensure!(args.producers != 0, "producers must not be zero");
    ensure!(args.consumers != 0, "consumers must not be zero");

    let queue = ConcurrentQueue::<Message>::new();
    let now = Instant::now();
    let reports = thread::scope(|cx| -> Result<Vec<Report>> {
        let queue = &queue;
        let args = &args;

        let producers = (0..args.producers)
            .map(|p| {
                thread::Builder::new()
                    .name(format!("producer-{p}"))
                    .spawn_scoped(cx, move || produce(queue, args, p))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let consumers = (0..args.consumers)
            .map(|c| {
                thread::Builder::new()
                    .name(format!("consumer-{c}"))
                    .spawn_scoped(cx, move || consume(queue))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let panicked = producers
            .into_iter()
            .map(|handle| handle.join())
            .filter(Result::is_err)
            .count();
        // Consumers must be released even if a producer failed, otherwise the
        // scope never returns.
        tracing::info!("producers finished, stopping consumers");
        for _ in 0..args.consumers {
            queue.push(Message::Stop);
        }

        let reports = consumers
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("consumer panicked")))
            .collect::<Result<Vec<_>>>()?;
        ensure!(panicked == 0, "{panicked} producer(s) panicked");
        Ok(reports)
    })?;

    let received = reports.iter().map(|r| r.received).sum::<usize>();
    let checksum = reports.iter().map(|r| r.checksum).sum::<u64>();
    let expected = args.producers * args.items;
    tracing::info!(
        "finished pipeline, received={received}, checksum={checksum:#x}, elapsed={}ms",
        now.elapsed().as_millis()
    );

    ensure!(
        received == expected,
        "lost or duplicated items: expected {expected}, received {received}"
    );
    ensure!(queue.try_pop().is_none(), "queue not drained");
    Ok(())
}

fn produce(queue: &ConcurrentQueue<Message>, args: &Args, producer: usize) {
    for seq in 0..args.items {
        queue.emplace((producer, seq));
        tracing::debug!("pushed job, seq={seq}");
        if args.max_delay_us != 0 {
            thread::sleep(Duration::from_micros(fastrand::u64(0..args.max_delay_us)));
        }
    }
    tracing::info!("produced {} jobs", args.items);
}

fn consume(queue: &ConcurrentQueue<Message>) -> Report {
    let mut report = Report::default();
    loop {
        match queue.wait_and_pop() {
            Message::Job { producer, seq } => {
                tracing::debug!("accepted job, producer={producer}, seq={seq}");
                report.received += 1;
                report.checksum = report
                    .checksum
                    .wrapping_add(((producer as u64) << 32) | seq as u64);
            },
            Message::Stop => break,
        }
    }
    tracing::info!("consumed {} jobs", report.received);
    report
}

use clipstream_accounts::models::{Subscription, User, Video};
use clipstream_accounts::services::profile::{build_channel_profile, join_watch_history, owner_map};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn bench_user(name: &str) -> User {
    User {
        id: name.to_string(),
        username: name.to_string(),
        email: format!("{name}@example.com"),
        full_name: format!("User {name}"),
        password_hash: "$argon2id$bench".to_string(),
        avatar_url: format!("https://media.example.com/assets/{name}.png"),
        cover_image_url: None,
        refresh_token: None,
        watch_history: Vec::new(),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn bench_video(index: usize, owner_id: &str) -> Video {
    Video {
        id: format!("video-{index}"),
        owner_id: owner_id.to_string(),
        title: format!("Video number {index}"),
        description: "benchmark fixture".to_string(),
        video_url: format!("https://media.example.com/videos/video-{index}.mp4"),
        thumbnail_url: format!("https://media.example.com/thumbs/video-{index}.png"),
        duration: 90.0 + index as f64,
        views: index as u64 * 7,
        is_published: true,
        created_at: "2026-02-01T00:00:00Z".to_string(),
    }
}

fn bench_edge(subscriber_id: &str, channel_id: &str) -> Subscription {
    Subscription {
        subscriber_id: subscriber_id.to_string(),
        channel_id: channel_id.to_string(),
        created_at: "2026-03-01T00:00:00Z".to_string(),
    }
}

fn benchmark_history_join(c: &mut Criterion) {
    // 20 uploaders shared across 500 history entries, with a 10% hole rate
    // standing in for videos deleted since they were watched
    let uploaders: Vec<User> = (0..20)
        .map(|i| bench_user(&format!("uploader-{i}")))
        .collect();
    let owner_lookup = owner_map(uploaders.iter().cloned().map(Some).collect());

    let videos: Vec<Option<Video>> = (0..500)
        .map(|i| {
            if i % 10 == 3 {
                None
            } else {
                Some(bench_video(i, &format!("uploader-{}", i % 20)))
            }
        })
        .collect();

    let mut group = c.benchmark_group("watch_history");

    group.bench_function("join_500_entries", |b| {
        b.iter_batched(
            || videos.clone(),
            |videos| join_watch_history(black_box(videos), black_box(&owner_lookup)),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("owner_map_20_uploaders", |b| {
        b.iter_batched(
            || uploaders.iter().cloned().map(Some).collect::<Vec<_>>(),
            |users| owner_map(black_box(users)),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn benchmark_channel_profile(c: &mut Criterion) {
    let channel = bench_user("channel");
    let subscribers: Vec<Subscription> = (0..10_000)
        .map(|i| bench_edge(&format!("fan-{i}"), "channel"))
        .collect();
    let subscribed_to: Vec<Subscription> = (0..50)
        .map(|i| bench_edge("channel", &format!("other-{i}")))
        .collect();

    let mut group = c.benchmark_group("channel_profile");

    // Worst case for the subscription check: the viewer is the last edge
    group.bench_function("profile_10k_subscribers_viewer_last", |b| {
        b.iter_batched(
            || channel.clone(),
            |user| {
                build_channel_profile(
                    black_box(user),
                    black_box(&subscribers),
                    black_box(&subscribed_to),
                    black_box(Some("fan-9999")),
                )
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("profile_10k_subscribers_anonymous", |b| {
        b.iter_batched(
            || channel.clone(),
            |user| {
                build_channel_profile(
                    black_box(user),
                    black_box(&subscribers),
                    black_box(&subscribed_to),
                    black_box(None),
                )
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, benchmark_history_join, benchmark_channel_profile);
criterion_main!(benches);

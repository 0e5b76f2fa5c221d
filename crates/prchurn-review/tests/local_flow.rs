use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use git2::{Repository, Signature, Time};
use prchurn_core::{HistoryConfig, Interval};
use prchurn_gitpulse::blame::LocalBlame;
use prchurn_review::pipeline::{ChurnPipeline, PipelineOptions};
use prchurn_review::source::DiffSource;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

fn commit(repo: &Repository, path: &str, content: &str, when: DateTime<Utc>) {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(path), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new("dev", "dev@example.com", &Time::new(when.timestamp(), 0)).unwrap();
    let parent = repo
        .find_reference("refs/heads/main")
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("refs/heads/main"), &sig, &sig, "change", &tree, &parents)
        .unwrap();
}

const PR_DIFF: &str = "\
diff --git a/app.py b/app.py
index 1111111..2222222 100644
--- a/app.py
+++ b/app.py
@@ -1,6 +1,6 @@
 a
-b
-C
+b2
+C2
 D
 e
 f
diff --git a/new.py b/new.py
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/new.py
@@ -0,0 +1,2 @@
+x = 1
+y = 2
";

#[tokio::test]
async fn local_diff_against_local_blame() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(&repo, "app.py", "a\nb\nc\nd\ne\nf\n", now() - Duration::days(200));
    commit(&repo, "app.py", "a\nb\nC\nD\ne\nf\n", now() - Duration::days(5));

    let prs = DiffSource::parse(PR_DIFF).unwrap();
    let blame = LocalBlame::new(dir.path());
    let options = PipelineOptions::from_config(&HistoryConfig::default()).with_now(now());

    let report = ChurnPipeline::new(&blame, options)
        .compute_churn(&prs, 0)
        .await
        .unwrap();

    // PR rewrites 2-3; lines 3-4 were changed five days ago.
    assert_eq!(report.total, 1);
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].changed, vec![Interval::new(2, 3)]);
    assert_eq!(report.files[0].recent, vec![Interval::new(3, 4)]);
    assert_eq!(report.files[0].overlap, vec![Interval::new(3, 3)]);
}

#[tokio::test]
async fn narrow_window_sees_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit(&repo, "app.py", "a\nb\nc\nd\ne\nf\n", now() - Duration::days(200));
    commit(&repo, "app.py", "a\nb\nC\nD\ne\nf\n", now() - Duration::days(5));

    let prs = DiffSource::parse(PR_DIFF).unwrap();
    let blame = LocalBlame::new(dir.path());
    let mut options = PipelineOptions::from_config(&HistoryConfig::default()).with_now(now());
    options.window_days = 4;

    let report = ChurnPipeline::new(&blame, options)
        .compute_churn(&prs, 0)
        .await
        .unwrap();

    assert_eq!(report.total, 0);
}

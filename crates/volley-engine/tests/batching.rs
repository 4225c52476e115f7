use volley_engine::backend::{BufferDescriptor, BufferKind, Command, FailPoint, RecordingBackend};
use volley_engine::batch::{BatchOptions, BatchPath, BatchPolicy, HomogeneityCheck};
use volley_engine::handle::{PipelineStateHandle, ResourceKindId};
use volley_engine::pipeline::{DataFormat, PipelineStateDescriptor, PrimitiveTopology, VertexElement};
use volley_engine::queue::DrawKind;
use volley_engine::{Backend, DrawQueue, SubmitError};

const CUBE_VERTICES: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
const CUBE_INDICES: [u32; 3] = [0, 1, 2];

struct Scene {
    backend: RecordingBackend,
    state: PipelineStateHandle,
}

fn scene(stride: u32) -> Scene {
    let backend = RecordingBackend::new();
    let vs = backend.create_vertex_shader(b"fn vs_main() {}", None);
    let ps = backend.create_pixel_shader(b"fn ps_main() {}", None);
    let shader = backend.link_surface_shader(vs, ps);
    let format = backend.create_vertex_format(
        &[VertexElement::new("POSITION", DataFormat::RGB32F, 0)],
        vs,
        None,
    );
    let mut desc = PipelineStateDescriptor::new(shader, format);
    desc.parameter_stride = stride;
    let state = backend.create_pipeline_state(&desc);
    assert!(state.is_valid());
    Scene { backend, state }
}

fn unchecked() -> BatchOptions {
    BatchOptions {
        policy: BatchPolicy::Instanced,
        check: HomogeneityCheck::Off,
    }
}

#[test]
fn three_cubes_become_one_instanced_draw() {
    let Scene { backend, state } = scene(16);
    let vb = backend.create_buffer(&BufferDescriptor::immutable(
        BufferKind::Vertex,
        bytemuck::cast_slice(&CUBE_VERTICES),
    ));
    let ib = backend.create_buffer(&BufferDescriptor::immutable(
        BufferKind::Index,
        bytemuck::cast_slice(&CUBE_INDICES),
    ));

    let mut queue = DrawQueue::new(state);
    queue.set_vertex_buffer(vb);
    queue.set_index_buffer(ib);
    for blob in [[0xa; 16], [0xb; 16], [0xc; 16]] {
        queue.set_constants(0, &blob);
        queue.draw_indexed(36, 0, 0);
    }

    let report = queue.submit(&backend, &unchecked()).unwrap();
    assert_eq!(report.path, BatchPath::Instanced);
    assert_eq!(report.draws_issued, 1);
    assert_eq!(report.instances, 3);
    assert!(queue.is_empty());

    let draws: Vec<_> = backend
        .commands()
        .into_iter()
        .filter(|c| matches!(c, Command::Draw { .. }))
        .collect();
    assert_eq!(
        draws,
        vec![Command::Draw {
            kind: DrawKind::DrawIndexed,
            count: 36,
            start_index: 0,
            start_vertex: 0,
            instances: 0..3,
        }]
    );

    let mut expected = vec![0xa; 16];
    expected.extend([0xb; 16]);
    expected.extend([0xc; 16]);
    assert_eq!(backend.shared_buffer_contents(state), Some(expected));
}

#[test]
fn fast_path_command_order() {
    let Scene { backend, state } = scene(4);
    let mut queue = DrawQueue::new(state);
    queue.set_constants(0, &[1, 2, 3, 4]);
    queue.draw(3, 0);
    queue.submit(&backend, &unchecked()).unwrap();

    let commands = backend.take_commands();
    assert_eq!(commands.len(), 6);
    assert!(matches!(commands[0], Command::SetPipelineState { .. }));
    assert_eq!(commands[1], Command::AllocateShared { bytes: 4, stride: 4 });
    assert_eq!(commands[2], Command::WriteShared { offset: 0, data: vec![1, 2, 3, 4] });
    assert_eq!(commands[3], Command::BindShared);
    assert!(matches!(commands[4], Command::BindGeometry { topology: PrimitiveTopology::TriangleList, .. }));
    assert!(matches!(commands[5], Command::Draw { instances: ref r, .. } if *r == (0..1)));
}

#[test]
fn heterogeneous_queue_falls_back_under_auto() {
    let Scene { backend, state } = scene(8);
    let a = backend.create_buffer(&BufferDescriptor::dynamic(BufferKind::Vertex, 64));
    let b = backend.create_buffer(&BufferDescriptor::dynamic(BufferKind::Vertex, 64));

    let mut queue = DrawQueue::new(state);
    queue.set_vertex_buffer(a);
    queue.set_constants_pod(0, &[1u32, 1]);
    queue.draw(6, 0);
    queue.set_vertex_buffer(b);
    queue.set_primitive_topology(PrimitiveTopology::LineList);
    queue.set_constants_pod(0, &[2u32, 2]);
    queue.draw(4, 0);

    let report = queue
        .submit(&backend, &BatchOptions::with_policy(BatchPolicy::Auto))
        .unwrap();
    assert_eq!(report.path, BatchPath::PerDraw);
    assert_eq!(report.draws_issued, 2);
    assert_eq!(report.precondition_violation, Some(1));

    let commands = backend.commands();
    let writes = commands
        .iter()
        .filter(|c| matches!(c, Command::WriteShared { .. }))
        .count();
    assert_eq!(writes, 2);
    assert!(commands.contains(&Command::BindGeometry {
        topology: PrimitiveTopology::LineList,
        vertex_buffer: b,
        index_buffer: Default::default(),
    }));

    let shared = backend.shared_buffer_contents(state).unwrap();
    assert_eq!(shared.as_slice(), bytemuck::cast_slice::<u32, u8>(&[1, 1, 2, 2]));
}

#[test]
fn shared_store_is_grow_only() {
    let Scene { backend, state } = scene(16);
    let mut queue = DrawQueue::new(state);

    for (n, expected_capacity, grew) in [(4, 64, true), (2, 64, false), (6, 96, true), (6, 96, false)] {
        for _ in 0..n {
            queue.draw(3, 0);
        }
        let report = queue.submit(&backend, &unchecked()).unwrap();
        assert_eq!(report.reallocated, grew, "batch of {n}");
        assert_eq!(backend.shared_capacity(state), expected_capacity);
    }

    let allocations = backend
        .commands()
        .into_iter()
        .filter(|c| matches!(c, Command::AllocateShared { .. }))
        .count();
    assert_eq!(allocations, 2);
}

#[test]
fn failed_submission_still_clears_queue() {
    let Scene { backend, state } = scene(16);
    let mut queue = DrawQueue::new(state);
    queue.draw(3, 0);
    queue.submit(&backend, &unchecked()).unwrap();

    backend.fail_next(FailPoint::SharedBufferAllocation);
    queue.draw(3, 0);
    queue.draw(3, 0);
    let err = queue.submit(&backend, &unchecked()).unwrap_err();
    assert_eq!(err, SubmitError::SharedBufferAllocation { bytes: 32 });
    assert!(queue.is_empty());
    assert_eq!(backend.shared_capacity(state), 16);

    backend.fail_next(FailPoint::SharedBufferWrite);
    queue.draw(3, 0);
    assert!(matches!(
        queue.submit(&backend, &unchecked()),
        Err(SubmitError::SharedBufferWrite { offset: 0, len: 16 })
    ));
    assert!(queue.is_empty());
}

#[test]
fn empty_submit_is_a_no_op() {
    let Scene { backend, state } = scene(16);
    let mut queue = DrawQueue::new(state);
    let report = queue.submit(&backend, &BatchOptions::default()).unwrap();
    assert_eq!(report.path, BatchPath::Empty);
    assert!(backend.commands().is_empty());
}

#[test]
fn releasing_pipeline_drops_its_state_objects() {
    let Scene { backend, state } = scene(16);
    assert_eq!(backend.live_state_objects(), 3);
    volley_engine::handle::Release::release(&backend, ResourceKindId::PipelineState, state.raw());
    assert_eq!(backend.live_state_objects(), 0);

    let mut queue = DrawQueue::new(state);
    queue.draw(3, 0);
    assert_eq!(
        queue.submit(&backend, &unchecked()),
        Err(SubmitError::UnknownPipelineState)
    );
}
